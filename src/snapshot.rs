use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::graph::DependencyGraph;
use crate::parser::exports::ExportFacts;
use crate::parser::imports::RawImports;
use crate::resolver::alias::AliasRule;
use crate::semantics::SemanticFacts;

/// Current index snapshot format version. Bump when the FileRecord or graph
/// layout changes — a bump invalidates the cache unconditionally for all
/// files, so prior records are never misread through a new lens.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata directory name (created in the project root).
pub const META_DIR: &str = ".code-atlas";
/// Snapshot file name within META_DIR.
pub const INDEX_FILE: &str = "index.json";
/// Condensed digest file name within META_DIR.
pub const INDEX_DIGEST_FILE: &str = "digest.md";
/// Description record set file name within META_DIR.
pub const DESCRIPTIONS_FILE: &str = "descriptions.json";
/// Condensed description digest file name within META_DIR.
pub const DESCRIPTIONS_DIGEST_FILE: &str = "descriptions.md";

/// Fixed-size digest of a file's text, used to detect change between runs.
pub fn content_hash(text: &[u8]) -> String {
    format!("{:016x}", xxh3_64(text))
}

/// Seconds since the Unix epoch — the snapshot's generation time.
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Everything the index knows about one tracked source file.
///
/// Identity is the repository-relative path — the key of
/// [`IndexSnapshot::files`]. Refreshed when the content hash changes; carried
/// verbatim otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Source kind: the file extension (`ts` | `tsx` | `js` | `jsx`).
    pub kind: String,
    /// Byte size of the file text.
    pub size: u64,
    /// Content hash of the file text.
    pub hash: String,
    /// Raw static/dynamic import specifiers.
    pub imports: RawImports,
    /// Export facts.
    pub exports: ExportFacts,
    /// Semantic facts. Optional so a structurally incomplete prior record
    /// (written by a buggy or interrupted producer) deserializes instead of
    /// failing, and is then rebuilt rather than carried.
    #[serde(default)]
    pub semantic: Option<SemanticFacts>,
}

impl FileRecord {
    /// Cache carry rule, per-record half: the stored hash must equal the
    /// freshly computed one and the semantic facts must be structurally
    /// present. (The schema-version half is enforced when the prior snapshot
    /// is loaded.)
    pub fn can_carry(&self, fresh_hash: &str) -> bool {
        self.hash == fresh_hash && self.semantic.is_some()
    }
}

/// Project-level metadata embedded in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Alias rules in effect for the run.
    pub alias_rules: Vec<AliasRule>,
    /// Number of tracked source files.
    pub file_count: usize,
    /// File counts per source kind.
    pub kind_counts: BTreeMap<String, usize>,
}

/// The persisted index: the sole input to the next run's reuse decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub schema_version: u32,
    /// Seconds since the Unix epoch at generation time.
    pub generated_at: u64,
    pub project: ProjectMeta,
    pub files: BTreeMap<String, FileRecord>,
    pub graph: DependencyGraph,
}

/// Build the metadata directory path for a project.
pub fn meta_dir(root: &Path) -> PathBuf {
    root.join(META_DIR)
}

/// Build the snapshot file path for a project: `<root>/.code-atlas/index.json`.
pub fn index_path(root: &Path) -> PathBuf {
    meta_dir(root).join(INDEX_FILE)
}

/// Load the prior snapshot for incremental reuse. Returns None if:
/// - the snapshot file doesn't exist
/// - its schema version doesn't match [`SCHEMA_VERSION`]
/// - deserialization fails (corrupt file)
///
/// None means every file is treated as fresh — a full rebuild.
pub fn load_prior_snapshot(root: &Path) -> Option<IndexSnapshot> {
    let bytes = std::fs::read(index_path(root)).ok()?;
    match serde_json::from_slice::<IndexSnapshot>(&bytes) {
        Ok(snapshot) if snapshot.schema_version == SCHEMA_VERSION => Some(snapshot),
        _ => None, // version mismatch or corrupt — caller will do a full rebuild
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::FeatureKind;
    use std::fs;
    use tempfile::TempDir;

    fn record(hash: &str, with_semantic: bool) -> FileRecord {
        FileRecord {
            kind: "ts".into(),
            size: 10,
            hash: hash.into(),
            imports: RawImports::default(),
            exports: ExportFacts::default(),
            semantic: with_semantic.then(|| SemanticFacts {
                feature: FeatureKind::Module,
                routes: vec![],
                tags: vec![],
                endpoints: vec![],
                storage_keys: vec![],
                env_vars: vec![],
            }),
        }
    }

    fn snapshot(version: u32) -> IndexSnapshot {
        IndexSnapshot {
            schema_version: version,
            generated_at: 1000,
            project: ProjectMeta::default(),
            files: BTreeMap::from([("a.ts".to_owned(), record("00ff", true))]),
            graph: DependencyGraph::default(),
        }
    }

    fn write_snapshot(root: &Path, snap: &IndexSnapshot) {
        fs::create_dir_all(meta_dir(root)).unwrap();
        fs::write(index_path(root), serde_json::to_vec(snap).unwrap()).unwrap();
    }

    #[test]
    fn test_content_hash_is_stable_and_changes_with_text() {
        let a = content_hash(b"export const x = 1;");
        let b = content_hash(b"export const x = 1;");
        let c = content_hash(b"export const x = 2;");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_carry_requires_hash_and_semantic() {
        assert!(record("00ff", true).can_carry("00ff"));
        assert!(!record("00ff", true).can_carry("1234"));
        assert!(!record("00ff", false).can_carry("00ff"));
    }

    #[test]
    fn test_load_prior_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), &snapshot(SCHEMA_VERSION));
        let loaded = load_prior_snapshot(dir.path()).expect("snapshot should load");
        assert_eq!(loaded.files["a.ts"].hash, "00ff");
    }

    #[test]
    fn test_schema_version_mismatch_invalidates() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), &snapshot(SCHEMA_VERSION + 1));
        assert!(load_prior_snapshot(dir.path()).is_none());
    }

    #[test]
    fn test_missing_or_corrupt_snapshot_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_prior_snapshot(dir.path()).is_none());
        fs::create_dir_all(meta_dir(dir.path())).unwrap();
        fs::write(index_path(dir.path()), b"not json").unwrap();
        assert!(load_prior_snapshot(dir.path()).is_none());
    }

    #[test]
    fn test_record_without_semantic_block_deserializes() {
        let json = r#"{
            "kind": "ts", "size": 3, "hash": "ab",
            "imports": {"static_specifiers": [], "dynamic_specifiers": []},
            "exports": {"named": [], "has_default": false}
        }"#;
        let rec: FileRecord = serde_json::from_str(json).unwrap();
        assert!(rec.semantic.is_none());
        assert!(!rec.can_carry("ab"), "missing semantic facts block carry");
    }
}
