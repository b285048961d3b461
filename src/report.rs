use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::describe::{DescribeStats, DescriptionSet};
use crate::snapshot::{
    DESCRIPTIONS_DIGEST_FILE, DESCRIPTIONS_FILE, INDEX_DIGEST_FILE, INDEX_FILE, IndexSnapshot,
    meta_dir,
};

// ---------------------------------------------------------------------------
// Run summaries
// ---------------------------------------------------------------------------

/// Aggregate statistics produced by an indexing run.
#[derive(Debug, Default, Serialize)]
pub struct IndexStats {
    pub file_count: usize,
    /// Records carried unchanged from the prior snapshot.
    pub carried: usize,
    /// Records parsed fresh this run.
    pub parsed: usize,
    pub local_edges: usize,
    pub unresolved_imports: usize,
    pub external_packages: usize,
    pub alias_rules: usize,
    /// Wall-clock time for the indexing run in seconds.
    pub elapsed_secs: f64,
}

/// Print a summary of the indexing run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
pub fn print_index_summary(stats: &IndexStats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!(
        "Indexed {} files in {:.2}s ({} carried, {} parsed)",
        stats.file_count, stats.elapsed_secs, stats.carried, stats.parsed
    );
    println!(
        "  {} local edges, {} unresolved imports, {} external packages",
        stats.local_edges, stats.unresolved_imports, stats.external_packages
    );
    println!("  {} alias rules in effect", stats.alias_rules);
}

/// Print a summary of the description pass.
pub fn print_describe_summary(stats: &DescribeStats, json: bool) {
    if json {
        println!(
            "{{\"total\": {}, \"generated\": {}, \"carried\": {}}}",
            stats.total, stats.generated, stats.carried
        );
        return;
    }
    println!(
        "Described {} files ({} generated, {} carried)",
        stats.total, stats.generated, stats.carried
    );
}

// ---------------------------------------------------------------------------
// Atomic persistence
// ---------------------------------------------------------------------------

/// Atomically write `contents` to `<meta dir>/<name>`: temp file in the same
/// directory, flush, then rename over the target.
fn write_atomic(root: &Path, name: &str, contents: &[u8]) -> Result<()> {
    let dir = meta_dir(root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create metadata directory {}", dir.display()))?;

    let target = dir.join(name);
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents)?;
    tmp.as_file().flush()?;
    tmp.persist(&target)
        .with_context(|| format!("failed to persist {}", target.display()))?;
    Ok(())
}

/// Persist the snapshot and its digest. A failure anywhere leaves the prior
/// files untouched.
pub fn write_snapshot(root: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot).context("failed to serialize snapshot")?;
    write_atomic(root, INDEX_FILE, &json)?;
    write_atomic(root, INDEX_DIGEST_FILE, render_index_digest(snapshot).as_bytes())?;
    Ok(())
}

/// Persist the description set and its digest.
pub fn write_descriptions(root: &Path, set: &DescriptionSet) -> Result<()> {
    let json = serde_json::to_vec_pretty(set).context("failed to serialize descriptions")?;
    write_atomic(root, DESCRIPTIONS_FILE, &json)?;
    write_atomic(
        root,
        DESCRIPTIONS_DIGEST_FILE,
        render_descriptions_digest(set).as_bytes(),
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Digest rendering
// ---------------------------------------------------------------------------

/// Render the condensed human-readable digest of a snapshot.
pub fn render_index_digest(snapshot: &IndexSnapshot) -> String {
    let mut out = String::new();
    out.push_str("# Code atlas digest\n\n");
    out.push_str(&format!(
        "{} files indexed (snapshot schema v{}, generated at {}).\n\n",
        snapshot.project.file_count, snapshot.schema_version, snapshot.generated_at
    ));

    out.push_str("## Source kinds\n\n");
    for (kind, count) in &snapshot.project.kind_counts {
        out.push_str(&format!("- {kind}: {count}\n"));
    }

    let tags = top_tags(snapshot, 10);
    if !tags.is_empty() {
        out.push_str("\n## Top tags\n\n");
        for (tag, count) in tags {
            out.push_str(&format!("- {tag}: {count}\n"));
        }
    }

    out.push_str("\n## Directories\n\n");
    for (dir, count) in directory_counts(snapshot) {
        out.push_str(&format!("- {dir}: {count}\n"));
    }

    let referenced = snapshot.graph.most_referenced(10);
    if !referenced.is_empty() {
        out.push_str("\n## Most referenced\n\n");
        for (path, count) in referenced {
            let noun = if count == 1 { "dependent" } else { "dependents" };
            out.push_str(&format!("- {path} — {count} {noun}\n"));
        }
    }

    if !snapshot.project.alias_rules.is_empty() {
        out.push_str("\n## Alias rules\n\n");
        for rule in &snapshot.project.alias_rules {
            out.push_str(&format!("- `{}` -> `{}`\n", rule.pattern, rule.targets.join("`, `")));
        }
    }

    out
}

/// Render the condensed digest of the description set, grouped by feature.
pub fn render_descriptions_digest(set: &DescriptionSet) -> String {
    let mut by_feature: BTreeMap<&str, Vec<(&String, &crate::describe::DescriptionRecord)>> =
        BTreeMap::new();
    for (path, record) in &set.descriptions {
        by_feature
            .entry(record.feature.as_str())
            .or_default()
            .push((path, record));
    }

    let pending = set.descriptions.values().filter(|r| r.needs_review).count();

    let mut out = String::new();
    out.push_str("# File descriptions\n\n");
    out.push_str(&format!(
        "{} files described, {} awaiting review (schema v{}, generated at {}).\n",
        set.descriptions.len(),
        pending,
        set.schema_version,
        set.generated_at
    ));

    for (feature, records) in by_feature {
        out.push_str(&format!("\n## {feature}\n\n"));
        for (path, record) in records {
            let marker = if record.needs_review { " (review)" } else { "" };
            out.push_str(&format!("- **{path}**{marker}: {}\n", record.description));
        }
    }

    out
}

/// Tag frequencies across all files, most frequent first, ties alphabetical.
fn top_tags(snapshot: &IndexSnapshot, limit: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in snapshot.files.values() {
        if let Some(sem) = &record.semantic {
            for tag in &sem.tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(String, usize)> =
        counts.into_iter().map(|(t, c)| (t.to_owned(), c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// File counts per top-level directory (`(root)` for bare filenames).
fn directory_counts(snapshot: &IndexSnapshot) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for path in snapshot.files.keys() {
        let dir = match path.split_once('/') {
            Some((first, _)) => first.to_owned(),
            None => "(root)".to_owned(),
        };
        *counts.entry(dir).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}
