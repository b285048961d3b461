mod cli;
mod config;
mod describe;
mod discovery;
mod graph;
mod indexer;
mod parser;
mod report;
mod resolver;
mod semantics;
mod snapshot;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use config::AtlasConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            path,
            verbose,
            json,
        } => {
            let config = AtlasConfig::load(&path);
            let (snapshot, stats) = indexer::run_index(&path, &config, verbose)?;
            report::write_snapshot(&path, &snapshot)?;
            report::print_index_summary(&stats, json);
        }
        Commands::Describe {
            path,
            verbose,
            json,
        } => {
            let (set, stats) = indexer::run_describe(&path, verbose)?;
            report::write_descriptions(&path, &set)?;
            report::print_describe_summary(&stats, json);
        }
    }

    Ok(())
}
