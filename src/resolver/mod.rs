pub mod alias;

use std::collections::BTreeSet;
use std::path::Path;

use crate::parser::imports::RawImports;
use crate::parser::languages::SOURCE_EXTENSIONS;
use alias::{AliasRule, apply_alias};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// The classification of a single import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportClass {
    /// Resolved to a repository-relative path.
    Local(String),
    /// Syntactically local (relative / root-absolute / aliased) but no
    /// matching file exists on disk. Carries the raw specifier.
    LocalUnresolved(String),
    /// A published package, reduced to its package identity.
    External(String),
}

/// The resolved dependency sets for one file: deduplicated, lexicographically
/// sorted, merged from both static and dynamic specifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedDeps {
    pub local: BTreeSet<String>,
    pub local_unresolved: BTreeSet<String>,
    pub external: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Specifier classification
// ---------------------------------------------------------------------------

/// Resolve one raw specifier from the perspective of `importer`
/// (a repository-relative path).
///
/// Strategy order is fixed: relative, root-absolute, alias substitution,
/// external fallback. Local candidates are settled by a pure
/// filesystem-existence probe rooted at `root`; parsed facts of the target are
/// never consulted.
pub fn resolve_specifier(
    root: &Path,
    importer: &str,
    specifier: &str,
    rules: &[AliasRule],
) -> ImportClass {
    let candidate = if specifier.starts_with("./") || specifier.starts_with("../") {
        let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        normalize_path(&join_path(dir, specifier))
    } else if let Some(rest) = specifier.strip_prefix('/') {
        normalize_path(rest)
    } else if let Some(substituted) = apply_alias(rules, specifier) {
        normalize_path(&substituted)
    } else {
        return ImportClass::External(extract_package_name(specifier).to_owned());
    };

    match probe_local(root, &candidate) {
        Some(path) => ImportClass::Local(path),
        None => ImportClass::LocalUnresolved(specifier.to_owned()),
    }
}

/// Probe the filesystem for a local candidate path.
///
/// A candidate that already carries an extension is tested as-is. Otherwise
/// each recognized extension is appended directly, then appended to `/index`,
/// in the fixed [`SOURCE_EXTENSIONS`] order. First existing path wins.
fn probe_local(root: &Path, candidate: &str) -> Option<String> {
    if Path::new(candidate).extension().is_some() {
        return root.join(candidate).is_file().then(|| candidate.to_owned());
    }

    for ext in SOURCE_EXTENSIONS {
        let with_ext = format!("{candidate}.{ext}");
        if root.join(&with_ext).is_file() {
            return Some(with_ext);
        }
    }
    for ext in SOURCE_EXTENSIONS {
        let index = format!("{candidate}/index.{ext}");
        if root.join(&index).is_file() {
            return Some(index);
        }
    }
    None
}

/// Join a directory and a relative specifier with `/`, without touching the OS
/// path layer — repository paths always use forward slashes.
fn join_path(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        rel.to_owned()
    } else {
        format!("{dir}/{rel}")
    }
}

/// Lexically normalize `.` and `..` segments. A `..` that escapes the
/// repository root is kept, so the subsequent existence probe fails and the
/// specifier lands in local_unresolved.
fn normalize_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if stack.last().is_some_and(|s| *s != "..") {
                    stack.pop();
                } else {
                    stack.push("..");
                }
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// Extract the canonical package name from a module specifier.
///
/// - `react` → `react`
/// - `@org/utils` → `@org/utils`  (scoped package — keep both parts)
/// - `lodash/merge` → `lodash`    (subpath import)
/// - `@org/utils/helpers` → `@org/utils`  (scoped package subpath)
fn extract_package_name(specifier: &str) -> &str {
    if specifier.starts_with('@') {
        // Scoped package: `@scope/name[/subpath]` — keep first two segments.
        let parts: Vec<&str> = specifier.splitn(3, '/').collect();
        if parts.len() >= 2 {
            let scope_end = parts[0].len() + 1 + parts[1].len();
            &specifier[..scope_end]
        } else {
            specifier
        }
    } else {
        // Unscoped: `name[/subpath]` — keep first segment.
        match specifier.find('/') {
            Some(idx) => &specifier[..idx],
            None => specifier,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file resolution
// ---------------------------------------------------------------------------

/// Resolve every raw specifier of one file into the three output sets.
pub fn resolve_file(
    root: &Path,
    importer: &str,
    raw: &RawImports,
    rules: &[AliasRule],
) -> ResolvedDeps {
    let mut deps = ResolvedDeps::default();
    let specifiers = raw
        .static_specifiers
        .iter()
        .chain(raw.dynamic_specifiers.iter());

    for specifier in specifiers {
        match resolve_specifier(root, importer, specifier, rules) {
            ImportClass::Local(path) => {
                deps.local.insert(path);
            }
            ImportClass::LocalUnresolved(spec) => {
                deps.local_unresolved.insert(spec);
            }
            ImportClass::External(pkg) => {
                deps.external.insert(pkg);
            }
        }
    }
    deps
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
