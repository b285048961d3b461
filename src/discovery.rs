use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::config::AtlasConfig;
use crate::parser::languages::SOURCE_EXTENSIONS;

/// Obtain the tracked source-file set for a project.
///
/// The authoritative path set comes from `git ls-files` — files not under
/// version control are excluded even if present on disk. The listing is then
/// filtered to recognized source extensions and any config exclusions.
/// Returned paths are repository-relative with forward slashes, sorted.
///
/// When `verbose` is true, each discovered file path is printed to stderr.
///
/// # Errors
/// Fails fatally when git cannot be spawned or exits non-zero — there is no
/// fallback discovery mode.
pub fn discover_tracked_files(
    root: &Path,
    config: &AtlasConfig,
    verbose: bool,
) -> Result<Vec<String>> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["ls-files", "-z"])
        .output()
        .context("failed to invoke git — is it installed and on PATH?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git ls-files failed in {} ({}): {}",
            root.display(),
            output.status,
            stderr.trim()
        );
    }

    let listing = String::from_utf8(output.stdout).context("git ls-files output was not UTF-8")?;

    let mut files: Vec<String> = listing
        .split('\0')
        .filter(|p| !p.is_empty())
        .filter(|p| has_source_extension(p))
        .filter(|p| !is_excluded_by_config(p, config))
        .map(str::to_owned)
        .collect();
    files.sort();

    if verbose {
        for path in &files {
            eprintln!("{path}");
        }
    }

    Ok(files)
}

/// Returns true if `path` ends in one of the recognized source extensions.
fn has_source_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Returns true if `path` matches any exclusion pattern from config.
/// A pattern may match the whole path or any single path component.
fn is_excluded_by_config(path: &str, config: &AtlasConfig) -> bool {
    let patterns = match &config.exclude {
        Some(p) => p,
        None => return false,
    };

    for pattern in patterns {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            continue;
        };
        if matcher.matches(path) {
            return true;
        }
        if path.split('/').any(|component| matcher.matches(component)) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Initialize a throwaway git repository with the given files tracked.
    fn git_fixture(files: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(args)
                .status()
                .expect("git invocation");
            assert!(status.success(), "git {:?} failed", args);
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "test"]);
        for rel in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "export {};").unwrap();
        }
        run(&["add", "."]);
        dir
    }

    #[test]
    fn test_discovers_only_tracked_source_files() {
        let dir = git_fixture(&["src/app.ts", "pages/home.tsx", "README.md"]);
        // Present on disk but never added to git — must not be discovered.
        fs::write(dir.path().join("untracked.ts"), "export {};").unwrap();

        let files = discover_tracked_files(dir.path(), &AtlasConfig::default(), false).unwrap();
        assert_eq!(files, vec!["pages/home.tsx", "src/app.ts"]);
    }

    #[test]
    fn test_exclude_patterns_apply() {
        let dir = git_fixture(&["src/app.ts", "vendor/lib.js", "src/gen.generated.ts"]);
        let config = AtlasConfig {
            exclude: Some(vec!["vendor".to_owned(), "*.generated.ts".to_owned()]),
        };
        let files = discover_tracked_files(dir.path(), &config, false).unwrap();
        assert_eq!(files, vec!["src/app.ts"]);
    }

    #[test]
    fn test_outside_repository_is_fatal() {
        // A bare temp directory has no repository; git exits non-zero.
        let dir = TempDir::new().unwrap();
        // Guard against the tempdir living under some enclosing repository.
        let isolated = dir.path().join("deep");
        fs::create_dir_all(&isolated).unwrap();
        fs::write(isolated.join(".git"), "gitdir: /nonexistent").unwrap();
        let err = discover_tracked_files(&isolated, &AtlasConfig::default(), false);
        assert!(err.is_err());
    }

    #[test]
    fn test_has_source_extension() {
        assert!(has_source_extension("a/b.ts"));
        assert!(has_source_extension("a/b.jsx"));
        assert!(!has_source_extension("a/b.css"));
        assert!(!has_source_extension("Makefile"));
    }
}
