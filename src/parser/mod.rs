pub mod exports;
pub mod imports;
pub mod languages;

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Node, Parser};

use exports::{ExportFacts, extract_exports};
use imports::{RawImports, extract_specifiers};
use languages::language_for_extension;

/// Extract the UTF-8 text of a node from the original source bytes.
pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// The import/export facts extracted from a single source file.
///
/// A pure function of (path, text): no filesystem access, no resolution.
#[derive(Debug, Clone, Default)]
pub struct SourceFacts {
    /// Raw static and dynamic import specifiers, in document order, deduplicated.
    pub imports: RawImports,
    /// Named exports and the default-export flag.
    pub exports: ExportFacts,
}

/// Parse a source file and extract its import/export facts.
///
/// Grammar selection happens by extension (`.ts` / `.tsx` / `.js` / `.jsx`).
/// tree-sitter produces error-tolerant trees, so malformed source still yields
/// whatever facts are recognizable; the theoretical `parse -> None` case
/// (cancellation, which this tool never configures) degrades to empty facts so
/// a single odd file cannot abort the run.
///
/// # Errors
/// Returns an error only for unsupported file extensions — discovery filters
/// to supported kinds, so hitting this indicates a caller bug.
pub fn parse_file(path: &Path, source: &[u8]) -> Result<SourceFacts> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let language = language_for_extension(ext)
        .ok_or_else(|| anyhow!("unsupported file extension: {:?}", ext))?;

    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .with_context(|| format!("failed to set tree-sitter language for extension {:?}", ext))?;

    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => return Ok(SourceFacts::default()),
    };

    Ok(SourceFacts {
        imports: extract_specifiers(&tree, source, ext, &language),
        exports: extract_exports(&tree, source, ext, &language),
    })
}
