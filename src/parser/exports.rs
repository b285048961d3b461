use std::sync::OnceLock;

use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

use super::node_text;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Export facts extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExportFacts {
    /// Identifiers exported via declarations carrying an `export` modifier, sorted.
    pub named: Vec<String>,
    /// Whether a default-export assignment exists.
    pub has_default: bool,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Exported declarations for TypeScript / TSX grammars.
/// Class/interface/type-alias names are `type_identifier` nodes in these grammars.
const EXPORT_DECL_QUERY_TS: &str = r#"
    (export_statement
      (function_declaration name: (identifier) @name)) @export
    (export_statement
      (class_declaration name: (type_identifier) @name)) @export
    (export_statement
      (interface_declaration name: (type_identifier) @name)) @export
    (export_statement
      (type_alias_declaration name: (type_identifier) @name)) @export
    (export_statement
      (enum_declaration name: (identifier) @name)) @export
    (export_statement
      (lexical_declaration (variable_declarator name: (identifier) @name))) @export
    (export_statement
      (variable_declaration (variable_declarator name: (identifier) @name))) @export
"#;

/// Exported declarations for the JavaScript grammar.
/// JavaScript has no interface/type-alias/enum declarations, and class names
/// are plain `identifier` nodes.
const EXPORT_DECL_QUERY_JS: &str = r#"
    (export_statement
      (function_declaration name: (identifier) @name)) @export
    (export_statement
      (class_declaration name: (identifier) @name)) @export
    (export_statement
      (lexical_declaration (variable_declarator name: (identifier) @name))) @export
    (export_statement
      (variable_declaration (variable_declarator name: (identifier) @name))) @export
"#;

/// Every export statement — scanned for the `default` keyword.
const EXPORT_STMT_QUERY: &str = r#"
    (export_statement) @stmt
"#;

// ---------------------------------------------------------------------------
// Query cache (compiled once per grammar via OnceLock)
// ---------------------------------------------------------------------------

struct ExportQueries {
    decls: Query,
    stmts: Query,
}

impl ExportQueries {
    fn compile(language: &Language, decl_source: &str) -> Self {
        Self {
            decls: Query::new(language, decl_source).expect("invalid export declaration query"),
            stmts: Query::new(language, EXPORT_STMT_QUERY).expect("invalid export statement query"),
        }
    }
}

static TS_QUERIES: OnceLock<ExportQueries> = OnceLock::new();
static TSX_QUERIES: OnceLock<ExportQueries> = OnceLock::new();
static JS_QUERIES: OnceLock<ExportQueries> = OnceLock::new();

fn queries_for(ext: &str, language: &Language) -> &'static ExportQueries {
    match ext {
        "ts" => TS_QUERIES.get_or_init(|| ExportQueries::compile(language, EXPORT_DECL_QUERY_TS)),
        "tsx" => TSX_QUERIES.get_or_init(|| ExportQueries::compile(language, EXPORT_DECL_QUERY_TS)),
        _ => JS_QUERIES.get_or_init(|| ExportQueries::compile(language, EXPORT_DECL_QUERY_JS)),
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Check whether an export_statement carries the `default` keyword among its
/// direct children (`export default ...`).
fn has_default_keyword(stmt: Node, source: &[u8]) -> bool {
    (0..stmt.child_count()).any(|i| {
        stmt.child(i as u32)
            .map(|c| node_text(c, source) == "default")
            .unwrap_or(false)
    })
}

/// Extract export facts from a parsed tree.
///
/// Named exports come from declarations nested in a non-default export
/// statement; `export default function foo()` sets the flag without
/// contributing `foo` to the named set.
pub fn extract_exports(tree: &Tree, source: &[u8], ext: &str, language: &Language) -> ExportFacts {
    let queries = queries_for(ext, language);
    let mut facts = ExportFacts::default();

    // --- Named declaration exports ---
    {
        let name_idx = queries
            .decls
            .capture_index_for_name("name")
            .expect("export declaration query must have @name");
        let export_idx = queries
            .decls
            .capture_index_for_name("export")
            .expect("export declaration query must have @export");

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&queries.decls, tree.root_node(), source);

        while let Some(m) = matches.next() {
            let mut name: Option<String> = None;
            let mut stmt: Option<Node> = None;

            for capture in m.captures {
                if capture.index == name_idx {
                    name = Some(node_text(capture.node, source).to_owned());
                } else if capture.index == export_idx {
                    stmt = Some(capture.node);
                }
            }

            if let (Some(name), Some(stmt)) = (name, stmt)
                && !has_default_keyword(stmt, source)
            {
                facts.named.push(name);
            }
        }
    }

    // --- Default export flag ---
    {
        let stmt_idx = queries
            .stmts
            .capture_index_for_name("stmt")
            .expect("export statement query must have @stmt");

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&queries.stmts, tree.root_node(), source);

        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index == stmt_idx && has_default_keyword(capture.node, source) {
                    facts.has_default = true;
                }
            }
        }
    }

    facts.named.sort();
    facts.named.dedup();
    facts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
