use std::sync::OnceLock;

use tree_sitter::{Language, Query, QueryCursor, StreamingIterator, Tree};

use super::node_text;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Raw module specifiers extracted from one source file, prior to resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawImports {
    /// Specifiers from static `import ... from` and `export ... from` declarations.
    pub static_specifiers: Vec<String>,
    /// Specifiers passed to dynamic `import(...)` or `require(...)` calls.
    pub dynamic_specifiers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Tree-sitter query for static specifiers: `import ... from 'm'` and
/// `export ... from 'm'` (re-exports carry a dependency edge like imports do).
const STATIC_SPECIFIER_QUERY: &str = r#"
    (import_statement
      source: (string (string_fragment) @specifier))
    (export_statement
      source: (string (string_fragment) @specifier))
"#;

/// Tree-sitter query for dynamic import() calls.
const DYNAMIC_IMPORT_QUERY: &str = r#"
    (call_expression
      function: (import)
      arguments: (arguments (string (string_fragment) @specifier)))
"#;

/// Tree-sitter query for CJS require calls.
/// Note: we do not use #eq? predicate here because tree-sitter 0.26 StreamingIterator
/// does not auto-filter custom predicates. We filter for "require" in code instead.
const REQUIRE_QUERY: &str = r#"
    (call_expression
      function: (identifier) @fn
      arguments: (arguments (string (string_fragment) @specifier)))
"#;

// ---------------------------------------------------------------------------
// Query cache (compiled once per grammar via OnceLock)
// ---------------------------------------------------------------------------

struct SpecifierQueries {
    static_q: Query,
    dynamic_q: Query,
    require_q: Query,
}

impl SpecifierQueries {
    fn compile(language: &Language) -> Self {
        Self {
            static_q: Query::new(language, STATIC_SPECIFIER_QUERY)
                .expect("invalid static specifier query"),
            dynamic_q: Query::new(language, DYNAMIC_IMPORT_QUERY)
                .expect("invalid dynamic import query"),
            require_q: Query::new(language, REQUIRE_QUERY).expect("invalid require query"),
        }
    }
}

static TS_QUERIES: OnceLock<SpecifierQueries> = OnceLock::new();
static TSX_QUERIES: OnceLock<SpecifierQueries> = OnceLock::new();
static JS_QUERIES: OnceLock<SpecifierQueries> = OnceLock::new();

/// Fetch (compiling on first use) the specifier queries for `ext`'s grammar.
/// The same query text compiles against all three grammars, but compiled
/// `Query` values are grammar-specific and must not be shared across them.
fn queries_for(ext: &str, language: &Language) -> &'static SpecifierQueries {
    match ext {
        "ts" => TS_QUERIES.get_or_init(|| SpecifierQueries::compile(language)),
        "tsx" => TSX_QUERIES.get_or_init(|| SpecifierQueries::compile(language)),
        _ => JS_QUERIES.get_or_init(|| SpecifierQueries::compile(language)),
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Run one specifier query and collect every `@specifier` capture in document order.
fn collect_specifiers(
    query: &Query,
    tree: &Tree,
    source: &[u8],
    fn_filter: Option<&str>,
    out: &mut Vec<String>,
) {
    let specifier_idx = query
        .capture_index_for_name("specifier")
        .expect("query must have @specifier");
    let fn_idx = query.capture_index_for_name("fn");

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), source);

    while let Some(m) = matches.next() {
        let mut specifier: Option<String> = None;
        let mut fn_name: Option<String> = None;

        for capture in m.captures {
            if capture.index == specifier_idx {
                specifier = Some(node_text(capture.node, source).to_owned());
            } else if fn_idx == Some(capture.index) {
                fn_name = Some(node_text(capture.node, source).to_owned());
            }
        }

        // The require query matches ALL call_expression(identifier, ...) patterns;
        // only keep the calls whose callee matches the filter.
        if let Some(expected) = fn_filter
            && fn_name.as_deref() != Some(expected)
        {
            continue;
        }

        if let Some(s) = specifier {
            out.push(s);
        }
    }
}

/// Deduplicate in place, keeping the first occurrence of each specifier.
fn dedup_preserving_order(specifiers: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    specifiers.retain(|s| seen.insert(s.clone()));
}

/// Extract all raw import specifiers (static, dynamic, require) from a parsed tree.
pub fn extract_specifiers(tree: &Tree, source: &[u8], ext: &str, language: &Language) -> RawImports {
    let queries = queries_for(ext, language);
    let mut raw = RawImports::default();

    collect_specifiers(&queries.static_q, tree, source, None, &mut raw.static_specifiers);
    collect_specifiers(&queries.dynamic_q, tree, source, None, &mut raw.dynamic_specifiers);
    collect_specifiers(
        &queries.require_q,
        tree,
        source,
        Some("require"),
        &mut raw.dynamic_specifiers,
    );

    dedup_preserving_order(&mut raw.static_specifiers);
    dedup_preserving_order(&mut raw.dynamic_specifiers);
    raw
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::languages::language_for_extension;

    fn extract(ext: &str, source: &str) -> RawImports {
        let lang = language_for_extension(ext).unwrap();
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&lang).unwrap();
        let tree = parser.parse(source.as_bytes(), None).unwrap();
        extract_specifiers(&tree, source.as_bytes(), ext, &lang)
    }

    #[test]
    fn test_static_import() {
        let raw = extract("ts", "import { useState } from 'react';\nimport x from './local';");
        assert_eq!(raw.static_specifiers, vec!["react", "./local"]);
        assert!(raw.dynamic_specifiers.is_empty());
    }

    #[test]
    fn test_reexport_source_is_static() {
        let raw = extract("ts", "export { helper } from './utils';\nexport * from './types';");
        assert_eq!(raw.static_specifiers, vec!["./utils", "./types"]);
    }

    #[test]
    fn test_dynamic_import() {
        let raw = extract("ts", "const mod = await import('./lazy');");
        assert_eq!(raw.dynamic_specifiers, vec!["./lazy"]);
        assert!(raw.static_specifiers.is_empty());
    }

    #[test]
    fn test_require_call() {
        let raw = extract("js", "const fs = require('fs');\nconsole.log('fs');");
        assert_eq!(raw.dynamic_specifiers, vec!["fs"]);
    }

    #[test]
    fn test_non_require_calls_ignored() {
        let raw = extract("js", "load('./thing'); fetch('/api/x');");
        assert!(raw.dynamic_specifiers.is_empty());
        assert!(raw.static_specifiers.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let raw = extract(
            "ts",
            "import a from './m';\nimport { b } from './m';\nimport './m';",
        );
        assert_eq!(raw.static_specifiers, vec!["./m"]);
    }

    #[test]
    fn test_tsx_with_markup() {
        let raw = extract(
            "tsx",
            "import Button from './Button';\nexport const P = () => <Button label=\"hi\" />;",
        );
        assert_eq!(raw.static_specifiers, vec!["./Button"]);
    }
}
