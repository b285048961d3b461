use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::AtlasConfig;
use crate::describe::{DescribeStats, DescriptionSet, load_prior_descriptions, synthesize};
use crate::discovery::discover_tracked_files;
use crate::graph::DependencyGraph;
use crate::parser::parse_file;
use crate::report::IndexStats;
use crate::resolver::{ResolvedDeps, resolve_file};
use crate::resolver::alias::load_alias_rules;
use crate::semantics::analyze;
use crate::snapshot::{
    FileRecord, IndexSnapshot, ProjectMeta, SCHEMA_VERSION, content_hash, load_prior_snapshot,
    now_epoch,
};

/// Run the full indexing pipeline over a project tree.
///
/// Strictly sequential, one file at a time. The prior snapshot is an explicit
/// value loaded at the start and consulted per file; the new snapshot is
/// returned for the caller to persist — nothing global is mutated.
///
/// # Errors
/// Fatal when git is unavailable or any tracked file cannot be read. No
/// partial snapshot is ever produced from a failed run.
pub fn run_index(
    root: &Path,
    config: &AtlasConfig,
    verbose: bool,
) -> Result<(IndexSnapshot, IndexStats)> {
    let started = Instant::now();
    let mut stats = IndexStats::default();

    // -----------------------------------------------------------------------
    // Step 1: Discovery — the authoritative tracked-file set.
    // -----------------------------------------------------------------------
    let files = discover_tracked_files(root, config, verbose)?;
    stats.file_count = files.len();

    // -----------------------------------------------------------------------
    // Step 2: Prior snapshot — the sole input to the reuse decision.
    // The load itself enforces the schema-version gate.
    // -----------------------------------------------------------------------
    let prior = load_prior_snapshot(root);
    if verbose {
        match &prior {
            Some(p) => eprintln!("  prior snapshot: {} files", p.files.len()),
            None => eprintln!("  no usable prior snapshot — full rebuild"),
        }
    }

    // -----------------------------------------------------------------------
    // Step 3: Alias rules, loaded once per run.
    // -----------------------------------------------------------------------
    let alias_rules = load_alias_rules(root);
    stats.alias_rules = alias_rules.len();

    // -----------------------------------------------------------------------
    // Step 4: Per-file extraction with content-hash-gated reuse.
    // Fresh files keep their text around for the semantic pass in step 6.
    // -----------------------------------------------------------------------
    let mut records: BTreeMap<String, FileRecord> = BTreeMap::new();
    let mut fresh_texts: BTreeMap<String, String> = BTreeMap::new();

    for path in &files {
        let text = std::fs::read_to_string(root.join(path))
            .with_context(|| format!("failed to read tracked file {path}"))?;
        let hash = content_hash(text.as_bytes());

        if let Some(prior_snapshot) = &prior
            && let Some(prev) = prior_snapshot.files.get(path)
            && prev.can_carry(&hash)
        {
            records.insert(path.clone(), prev.clone());
            stats.carried += 1;
            continue;
        }

        let facts = parse_file(Path::new(path), text.as_bytes())?;
        records.insert(
            path.clone(),
            FileRecord {
                kind: kind_of(path),
                size: text.len() as u64,
                hash,
                imports: facts.imports,
                exports: facts.exports,
                semantic: None, // filled in step 6, after resolution
            },
        );
        fresh_texts.insert(path.clone(), text);
        stats.parsed += 1;
        if verbose {
            eprintln!("  parsed {path}");
        }
    }

    // -----------------------------------------------------------------------
    // Step 5: Resolution + graph build. Always recomputed in full — edges
    // depend on resolution against the current file set, so per-file cache
    // reuse never shortcuts this step.
    // -----------------------------------------------------------------------
    let mut resolved: BTreeMap<String, ResolvedDeps> = BTreeMap::new();
    for (path, record) in &records {
        resolved.insert(
            path.clone(),
            resolve_file(root, path, &record.imports, &alias_rules),
        );
    }
    let graph = DependencyGraph::build(resolved);
    stats.local_edges = graph.local_edge_count();
    stats.unresolved_imports = graph.unresolved_count();
    stats.external_packages = graph.external_packages().len();

    // -----------------------------------------------------------------------
    // Step 6: Semantic tagging for fresh files (carried records keep theirs).
    // -----------------------------------------------------------------------
    for (path, text) in &fresh_texts {
        if let (Some(record), Some(deps)) = (records.get_mut(path), graph.deps.get(path)) {
            record.semantic = Some(analyze(path, text, &deps.external));
        }
    }

    // -----------------------------------------------------------------------
    // Step 7: Snapshot assembly.
    // -----------------------------------------------------------------------
    let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records.values() {
        *kind_counts.entry(record.kind.clone()).or_insert(0) += 1;
    }

    let snapshot = IndexSnapshot {
        schema_version: SCHEMA_VERSION,
        generated_at: now_epoch(),
        project: ProjectMeta {
            alias_rules,
            file_count: records.len(),
            kind_counts,
        },
        files: records,
        graph,
    };

    stats.elapsed_secs = started.elapsed().as_secs_f64();
    Ok((snapshot, stats))
}

/// Run the description pass over an existing snapshot.
///
/// # Errors
/// Fatal when no usable snapshot exists — the synthesizer is a second pass,
/// not an indexer.
pub fn run_describe(root: &Path, verbose: bool) -> Result<(DescriptionSet, DescribeStats)> {
    let snapshot = load_prior_snapshot(root).with_context(|| {
        format!(
            "no usable index snapshot under {} — run `code-atlas index` first",
            root.display()
        )
    })?;

    let prior = load_prior_descriptions(root);
    if verbose {
        match &prior {
            Some(p) => eprintln!("  prior descriptions: {} files", p.descriptions.len()),
            None => eprintln!("  no usable prior descriptions — full regeneration"),
        }
    }

    Ok(synthesize(&snapshot, prior.as_ref()))
}

fn kind_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_owned()
}
