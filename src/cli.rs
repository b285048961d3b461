use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// An incremental import/export index for TypeScript/JavaScript trees.
///
/// code-atlas reads the git-tracked file set, extracts import/export facts,
/// resolves every module reference, and persists a dependency graph plus
/// per-file semantic signals under `.code-atlas/` — recomputing only what
/// changed since the previous run.
#[derive(Parser, Debug)]
#[command(
    name = "code-atlas",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a project: discover tracked files, extract facts, resolve
    /// imports, build the dependency graph, and write the snapshot + digest.
    Index {
        /// Path to the project root to index.
        path: PathBuf,

        /// Print each discovered/parsed file path during indexing.
        #[arg(short, long)]
        verbose: bool,

        /// Output the run summary as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Synthesize per-file descriptions from an existing snapshot.
    ///
    /// A second pass over the index: descriptions are cached by content hash
    /// independently of the snapshot, so only changed files are rewritten.
    Describe {
        /// Path to the project root (must already have a snapshot).
        path: PathBuf,

        /// Print cache diagnostics during the pass.
        #[arg(short, long)]
        verbose: bool,

        /// Output the run summary as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}
