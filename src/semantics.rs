use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Coarse category describing a file's architectural role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Page,
    Component,
    Utility,
    Worker,
    Entry,
    Module,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Component => "component",
            Self::Utility => "utility",
            Self::Worker => "worker",
            Self::Entry => "entry",
            Self::Module => "module",
        }
    }
}

/// Heuristic per-file semantic signals. Explicitly approximate: derived from
/// raw path/text matching, never from cross-file context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticFacts {
    pub feature: FeatureKind,
    pub routes: Vec<String>,
    pub tags: Vec<String>,
    pub endpoints: Vec<String>,
    pub storage_keys: Vec<String>,
    pub env_vars: Vec<String>,
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// Per-file extraction caps. Scanning stops once a cap is reached.
const MAX_ENDPOINTS: usize = 25;
const MAX_STORAGE_KEYS: usize = 25;
const MAX_ENV_VARS: usize = 40;

/// Entry-point filenames. `index.*` is deliberately absent — barrel files are
/// everywhere and would swamp the classification.
const ENTRY_FILENAMES: &[&str] = &[
    "main.ts", "main.tsx", "main.js", "main.jsx", "app.ts", "app.tsx", "app.js", "app.jsx",
    "App.ts", "App.tsx", "App.js", "App.jsx",
];

/// Keyword → tag vocabulary, matched case-insensitively against both the path
/// and the full text.
const KEYWORD_TAGS: &[(&str, &str)] = &[
    ("auth", "auth"),
    ("login", "auth"),
    ("signup", "auth"),
    ("password", "auth"),
    ("payment", "payments"),
    ("stripe", "payments"),
    ("billing", "payments"),
    ("invoice", "payments"),
    ("chart", "charts"),
    ("websocket", "realtime"),
    ("socket.io", "realtime"),
    ("search", "search"),
    ("i18n", "i18n"),
    ("locale", "i18n"),
    ("notification", "notifications"),
    ("upload", "uploads"),
    ("qrcode", "qrcode"),
    ("zip", "zip"),
];

/// Substring → tag rules over declared external package identities
/// (e.g. `reactflow` → "flow", `jszip` → "zip", `qrcode.react` → "qrcode").
const PACKAGE_TAGS: &[(&str, &str)] = &[
    ("flow", "flow"),
    ("qrcode", "qrcode"),
    ("qr-code", "qrcode"),
    ("zip", "zip"),
    ("chart", "charts"),
    ("socket", "realtime"),
    ("i18n", "i18n"),
];

// ---------------------------------------------------------------------------
// Compiled literal scanners
// ---------------------------------------------------------------------------

fn endpoint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["'`](https?://[^"'`\s]+|/api/[^"'`\s]*)["'`]"#).expect("invalid endpoint regex")
    })
}

fn storage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:localStorage|sessionStorage)\.(?:getItem|setItem|removeItem)\(\s*["'`]([^"'`]+)["'`]"#)
            .expect("invalid storage regex")
    })
}

fn env_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:process\.env|import\.meta\.env)\.([A-Za-z_][A-Za-z0-9_]*)")
            .expect("invalid env regex")
    })
}

/// Collect capture group 1 of every match, first-occurrence order,
/// deduplicated, stopping once `cap` entries are recorded.
fn collect_capped(re: &Regex, text: &str, cap: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for m in re.captures_iter(text) {
        if out.len() >= cap {
            break;
        }
        let literal = m[1].to_owned();
        if seen.insert(literal.clone()) {
            out.push(literal);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Ordered path-segment rules, then entry filenames, else module.
fn classify_feature(path: &str) -> FeatureKind {
    let (dirs, filename) = match path.rsplit_once('/') {
        Some((d, f)) => (d, f),
        None => ("", path),
    };
    let has_segment = |names: &[&str]| dirs.split('/').any(|s| names.contains(&s));

    if has_segment(&["pages"]) {
        FeatureKind::Page
    } else if has_segment(&["components"]) {
        FeatureKind::Component
    } else if has_segment(&["utils", "lib", "helpers"]) {
        FeatureKind::Utility
    } else if has_segment(&["workers", "worker"]) {
        FeatureKind::Worker
    } else if ENTRY_FILENAMES.contains(&filename) {
        FeatureKind::Entry
    } else {
        FeatureKind::Module
    }
}

/// Route inference for files under a `pages` directory: `/` + base filename,
/// with `index` collapsing to `/`.
fn infer_routes(path: &str) -> Vec<String> {
    let (dirs, filename) = match path.rsplit_once('/') {
        Some((d, f)) => (d, f),
        None => return Vec::new(),
    };
    if !dirs.split('/').any(|s| s == "pages") {
        return Vec::new();
    }
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    if stem == "index" {
        vec!["/".to_owned()]
    } else {
        vec![format!("/{stem}")]
    }
}

/// Keyword tags from path + text, plus package-substring tags.
fn extract_tags(path: &str, text: &str, external_packages: &BTreeSet<String>) -> Vec<String> {
    let path_lower = path.to_lowercase();
    let text_lower = text.to_lowercase();

    let mut tags = BTreeSet::new();
    for (keyword, tag) in KEYWORD_TAGS {
        if path_lower.contains(keyword) || text_lower.contains(keyword) {
            tags.insert((*tag).to_owned());
        }
    }
    for pkg in external_packages {
        let pkg_lower = pkg.to_lowercase();
        for (needle, tag) in PACKAGE_TAGS {
            if pkg_lower.contains(needle) {
                tags.insert((*tag).to_owned());
            }
        }
    }
    tags.into_iter().collect()
}

/// Derive all semantic facts for one file. Pure function of
/// (path, text, declared external packages).
pub fn analyze(path: &str, text: &str, external_packages: &BTreeSet<String>) -> SemanticFacts {
    SemanticFacts {
        feature: classify_feature(path),
        routes: infer_routes(path),
        tags: extract_tags(path, text, external_packages),
        endpoints: collect_capped(endpoint_re(), text, MAX_ENDPOINTS),
        storage_keys: collect_capped(storage_re(), text, MAX_STORAGE_KEYS),
        env_vars: collect_capped(env_re(), text, MAX_ENV_VARS),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_plain(path: &str, text: &str) -> SemanticFacts {
        analyze(path, text, &BTreeSet::new())
    }

    #[test]
    fn test_route_inference() {
        assert_eq!(analyze_plain("pages/home.tsx", "").routes, vec!["/home"]);
        assert_eq!(analyze_plain("src/pages/index.tsx", "").routes, vec!["/"]);
        assert!(analyze_plain("components/nav.tsx", "").routes.is_empty());
    }

    #[test]
    fn test_feature_classification_order() {
        assert_eq!(analyze_plain("src/pages/home.tsx", "").feature, FeatureKind::Page);
        assert_eq!(
            analyze_plain("src/components/Button.tsx", "").feature,
            FeatureKind::Component
        );
        assert_eq!(analyze_plain("src/utils/fmt.ts", "").feature, FeatureKind::Utility);
        assert_eq!(analyze_plain("src/workers/sync.ts", "").feature, FeatureKind::Worker);
        assert_eq!(analyze_plain("src/main.tsx", "").feature, FeatureKind::Entry);
        assert_eq!(analyze_plain("src/store.ts", "").feature, FeatureKind::Module);
        // Segment rules win over entry filenames.
        assert_eq!(analyze_plain("pages/app.tsx", "").feature, FeatureKind::Page);
    }

    #[test]
    fn test_keyword_tags_from_path_and_text() {
        let facts = analyze_plain("src/auth/session.ts", "const url = 'checkout';");
        assert!(facts.tags.contains(&"auth".to_owned()));
        let facts = analyze_plain("src/misc.ts", "// handles STRIPE webhooks");
        assert_eq!(facts.tags, vec!["payments"]);
    }

    #[test]
    fn test_package_tags() {
        let pkgs: BTreeSet<String> =
            ["reactflow", "jszip", "qrcode.react"].iter().map(|s| s.to_string()).collect();
        let facts = analyze("src/diagram.ts", "", &pkgs);
        assert_eq!(facts.tags, vec!["flow", "qrcode", "zip"]);
    }

    #[test]
    fn test_endpoint_extraction() {
        let text = r#"
            fetch('/api/users');
            fetch("https://example.com/data");
            const nope = '/not-api';
        "#;
        let facts = analyze_plain("src/client.ts", text);
        assert_eq!(facts.endpoints, vec!["/api/users", "https://example.com/data"]);
    }

    #[test]
    fn test_endpoint_cap_enforced() {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("fetch('/api/resource/{i}');\n"));
        }
        let facts = analyze_plain("src/client.ts", &text);
        assert_eq!(facts.endpoints.len(), 25, "exactly 25 of 40 distinct literals recorded");
        assert_eq!(facts.endpoints[0], "/api/resource/0");
        assert_eq!(facts.endpoints[24], "/api/resource/24");
    }

    #[test]
    fn test_storage_keys() {
        let text = r#"
            localStorage.setItem('theme', value);
            sessionStorage.getItem("token");
            localStorage.removeItem('theme');
        "#;
        let facts = analyze_plain("src/store.ts", text);
        assert_eq!(facts.storage_keys, vec!["theme", "token"]);
    }

    #[test]
    fn test_env_var_idioms() {
        let text = "const a = process.env.API_URL;\nconst b = import.meta.env.VITE_KEY;";
        let facts = analyze_plain("src/env.ts", text);
        assert_eq!(facts.env_vars, vec!["API_URL", "VITE_KEY"]);
    }

    #[test]
    fn test_deduplication_preserves_first_occurrence() {
        let text = "fetch('/api/b'); fetch('/api/a'); fetch('/api/b');";
        let facts = analyze_plain("src/client.ts", text);
        assert_eq!(facts.endpoints, vec!["/api/b", "/api/a"]);
    }
}
