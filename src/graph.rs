use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::resolver::ResolvedDeps;

/// The bidirectional dependency graph: forward adjacency (`deps`) and reverse
/// adjacency (`reverse_deps`), both keyed by repository-relative path.
///
/// Recomputed in full every run — never carried from cache — because edges
/// depend on resolution against the *current* file set. BTree containers keep
/// every map and set sorted so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Per-file resolved dependency sets.
    pub deps: BTreeMap<String, ResolvedDeps>,
    /// For each path, the set of files whose `local` edges point at it.
    /// Every discovered file has an entry, possibly empty.
    pub reverse_deps: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build the graph from the per-file resolution output.
    ///
    /// Every discovered file gets a `deps` entry and a `reverse_deps` entry.
    /// Local edge targets outside the discovered set (possible because the
    /// existence probe accepts any on-disk file) also receive a reverse entry,
    /// preserving edge symmetry.
    pub fn build(resolved: BTreeMap<String, ResolvedDeps>) -> Self {
        let mut reverse_deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for path in resolved.keys() {
            reverse_deps.entry(path.clone()).or_default();
        }
        for (path, deps) in &resolved {
            for target in &deps.local {
                reverse_deps
                    .entry(target.clone())
                    .or_default()
                    .insert(path.clone());
            }
        }

        Self {
            deps: resolved,
            reverse_deps,
        }
    }

    /// Number of resolved local edges in the graph.
    pub fn local_edge_count(&self) -> usize {
        self.deps.values().map(|d| d.local.len()).sum()
    }

    /// Number of specifiers that stayed unresolved.
    pub fn unresolved_count(&self) -> usize {
        self.deps.values().map(|d| d.local_unresolved.len()).sum()
    }

    /// Distinct external package identities referenced anywhere in the tree.
    pub fn external_packages(&self) -> BTreeSet<String> {
        self.deps
            .values()
            .flat_map(|d| d.external.iter().cloned())
            .collect()
    }

    /// Paths ranked by how many files locally depend on them, most-referenced
    /// first; ties break lexicographically.
    pub fn most_referenced(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .reverse_deps
            .iter()
            .filter(|(_, dependents)| !dependents.is_empty())
            .map(|(path, dependents)| (path.as_str(), dependents.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}
