use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration files probed for alias rules, in order. The first one that
/// can be read wins — one project configuration file per run.
const ALIAS_CONFIG_FILES: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// A wildcard path-alias rule: `pattern` is wildcard-suffixed (`@app/*`) and
/// `targets` is the ordered candidate list from the configuration file.
///
/// Only the FIRST candidate target is ever applied; later candidates are
/// ignored by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub pattern: String,
    pub targets: Vec<String>,
}

/// Load alias rules from the project configuration, once per run.
///
/// Missing or malformed configuration yields an empty rule set — never an
/// error. Comments (`//` and `/* */`) are tolerated since tsconfig files
/// routinely carry them.
pub fn load_alias_rules(root: &Path) -> Vec<AliasRule> {
    for name in ALIAS_CONFIG_FILES {
        let path = root.join(name);
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        return parse_alias_rules(&contents);
    }
    Vec::new()
}

/// Parse alias rules out of a tsconfig-shaped JSON document.
///
/// Keeps only wildcard-suffixed patterns whose candidate list contains at
/// least one wildcard-suffixed target. Anything unparseable yields the empty
/// rule set.
fn parse_alias_rules(contents: &str) -> Vec<AliasRule> {
    let stripped = strip_json_comments(contents);
    let value: serde_json::Value = match serde_json::from_str(&stripped) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let Some(paths) = value
        .get("compilerOptions")
        .and_then(|c| c.get("paths"))
        .and_then(|p| p.as_object())
    else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for (pattern, targets) in paths {
        if !pattern.ends_with("/*") {
            continue;
        }
        let Some(arr) = targets.as_array() else {
            continue;
        };
        let targets: Vec<String> = arr
            .iter()
            .filter_map(|t| t.as_str())
            .filter(|t| t.ends_with("/*") || *t == "./*")
            .map(str::to_owned)
            .collect();
        if targets.is_empty() {
            continue;
        }
        rules.push(AliasRule {
            pattern: pattern.clone(),
            targets,
        });
    }
    rules
}

/// Apply the alias rules to a raw specifier.
///
/// The first rule whose non-wildcard prefix matches wins, and only its first
/// candidate target is used. A passthrough target (`./*`) yields the captured
/// suffix; a wildcard target yields `target_prefix + suffix` with any leading
/// `./` stripped. Returns `None` when no rule matches.
pub fn apply_alias(rules: &[AliasRule], specifier: &str) -> Option<String> {
    for rule in rules {
        let prefix = &rule.pattern[..rule.pattern.len() - 1]; // keep the trailing '/'
        let Some(suffix) = specifier.strip_prefix(prefix) else {
            continue;
        };

        let target = &rule.targets[0];
        if target == "./*" {
            return Some(suffix.to_owned());
        }
        let target_prefix = target
            .trim_end_matches('*')
            .trim_start_matches("./");
        return Some(format!("{target_prefix}{suffix}"));
    }
    None
}

/// Strip `//` line comments and `/* */` block comments outside string
/// literals. tsconfig files are JSONC in practice.
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }
    out
}
