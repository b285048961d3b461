use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::semantics::FeatureKind;
use crate::snapshot::{DESCRIPTIONS_FILE, FileRecord, IndexSnapshot, meta_dir, now_epoch};

/// Description record format version — independent of the index schema
/// version so descriptions can lag an index refresh without being misread.
pub const DESC_SCHEMA_VERSION: u32 = 1;

/// Clause caps for the fixed description template.
const MAX_NAMED_EXPORTS: usize = 6;
const MAX_EXTERNAL_DEPS: usize = 6;
const MAX_LOCAL_DEPS: usize = 4;
const MAX_ROUTES: usize = 3;
const MAX_TAGS: usize = 8;
const MAX_ENDPOINTS: usize = 2;
const MAX_STORAGE_KEYS: usize = 2;
const MAX_ENV_VARS: usize = 4;

/// A synthesized per-file summary, cached by (path, content hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    /// Content hash of the file the description was synthesized from.
    pub hash: String,
    pub feature: FeatureKind,
    pub description: String,
    /// Freshly generated text is flagged for human review; carried records
    /// keep their prior flag.
    pub needs_review: bool,
    /// `generated_at` of the run this record was carried from. Absent on
    /// fresh records; set once on first carry and preserved afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_from: Option<u64>,
}

/// The persisted description set — the synthesizer's own cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionSet {
    pub schema_version: u32,
    pub generated_at: u64,
    pub descriptions: BTreeMap<String, DescriptionRecord>,
}

/// Counters for one synthesis pass.
#[derive(Debug, Default)]
pub struct DescribeStats {
    pub total: usize,
    pub generated: usize,
    pub carried: usize,
}

/// Build the description file path: `<root>/.code-atlas/descriptions.json`.
pub fn descriptions_path(root: &Path) -> PathBuf {
    meta_dir(root).join(DESCRIPTIONS_FILE)
}

/// Load the prior description set. Same gate as the index cache: missing,
/// corrupt, or version-mismatched files mean a full regeneration.
pub fn load_prior_descriptions(root: &Path) -> Option<DescriptionSet> {
    let bytes = std::fs::read(descriptions_path(root)).ok()?;
    match serde_json::from_slice::<DescriptionSet>(&bytes) {
        Ok(set) if set.schema_version == DESC_SCHEMA_VERSION => Some(set),
        _ => None,
    }
}

/// Synthesize descriptions for every file in the snapshot, carrying prior
/// records whose hash still matches and generating the rest.
pub fn synthesize(
    snapshot: &IndexSnapshot,
    prior: Option<&DescriptionSet>,
) -> (DescriptionSet, DescribeStats) {
    let mut stats = DescribeStats::default();
    let mut descriptions = BTreeMap::new();

    for (path, record) in &snapshot.files {
        stats.total += 1;

        if let Some(prior_set) = prior
            && let Some(prev) = prior_set.descriptions.get(path)
            && prev.hash == record.hash
        {
            let mut carried = prev.clone();
            if carried.carried_from.is_none() {
                carried.carried_from = Some(prior_set.generated_at);
            }
            descriptions.insert(path.clone(), carried);
            stats.carried += 1;
            continue;
        }

        descriptions.insert(path.clone(), generate(path, record, snapshot));
        stats.generated += 1;
    }

    let set = DescriptionSet {
        schema_version: DESC_SCHEMA_VERSION,
        generated_at: now_epoch(),
        descriptions,
    };
    (set, stats)
}

/// Generate one fixed-template description.
fn generate(path: &str, record: &FileRecord, snapshot: &IndexSnapshot) -> DescriptionRecord {
    let feature = record
        .semantic
        .as_ref()
        .map(|s| s.feature)
        .unwrap_or(FeatureKind::Module);

    let mut clauses = vec![opening_clause(feature).to_owned()];
    clauses.push(exports_clause(record));
    if let Some(deps) = dependency_clause(path, snapshot) {
        clauses.push(deps);
    }
    if let Some(sem) = semantic_clause(record) {
        clauses.push(sem);
    }

    DescriptionRecord {
        hash: record.hash.clone(),
        feature,
        description: clauses.join(" "),
        needs_review: true,
        carried_from: None,
    }
}

fn opening_clause(feature: FeatureKind) -> &'static str {
    match feature {
        FeatureKind::Page => "Page-level view module.",
        FeatureKind::Component => "Reusable interface component.",
        FeatureKind::Utility => "Shared utility module.",
        FeatureKind::Worker => "Background worker module.",
        FeatureKind::Entry => "Application entry point.",
        FeatureKind::Module => "General application module.",
    }
}

fn exports_clause(record: &FileRecord) -> String {
    let named = &record.exports.named;
    if named.is_empty() && !record.exports.has_default {
        return "No exports detected.".to_owned();
    }
    if named.is_empty() {
        return "Provides a default export.".to_owned();
    }
    let listed = join_capped(named, MAX_NAMED_EXPORTS);
    if record.exports.has_default {
        format!("Exports {listed} and a default export.")
    } else {
        format!("Exports {listed}.")
    }
}

fn dependency_clause(path: &str, snapshot: &IndexSnapshot) -> Option<String> {
    let deps = snapshot.graph.deps.get(path)?;
    let mut parts = Vec::new();
    if !deps.external.is_empty() {
        let listed = join_capped(&deps.external.iter().cloned().collect::<Vec<_>>(), MAX_EXTERNAL_DEPS);
        parts.push(format!("Uses packages {listed}."));
    }
    if !deps.local.is_empty() {
        let listed = join_capped(&deps.local.iter().cloned().collect::<Vec<_>>(), MAX_LOCAL_DEPS);
        parts.push(format!("Builds on local modules {listed}."));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn semantic_clause(record: &FileRecord) -> Option<String> {
    let sem = record.semantic.as_ref()?;
    let mut parts = Vec::new();
    if !sem.routes.is_empty() {
        parts.push(format!("Routes: {}.", join_capped(&sem.routes, MAX_ROUTES)));
    }
    if !sem.tags.is_empty() {
        parts.push(format!("Tags: {}.", join_capped(&sem.tags, MAX_TAGS)));
    }
    if !sem.endpoints.is_empty() {
        parts.push(format!("Calls {}.", join_capped(&sem.endpoints, MAX_ENDPOINTS)));
    }
    if !sem.storage_keys.is_empty() {
        parts.push(format!(
            "Storage keys: {}.",
            join_capped(&sem.storage_keys, MAX_STORAGE_KEYS)
        ));
    }
    if !sem.env_vars.is_empty() {
        parts.push(format!("Env vars: {}.", join_capped(&sem.env_vars, MAX_ENV_VARS)));
    }
    if parts.is_empty() { None } else { Some(parts.join(" ")) }
}

/// Comma-join up to `cap` items, appending the count of anything elided.
fn join_capped(items: &[String], cap: usize) -> String {
    if items.len() <= cap {
        items.join(", ")
    } else {
        format!("{} (+{} more)", items[..cap].join(", "), items.len() - cap)
    }
}
