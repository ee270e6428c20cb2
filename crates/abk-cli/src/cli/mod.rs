//! CLI for the ABK backup tool.

mod commands;

use abk_core::config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use commands::{
    run_checksum, run_config, run_copy, run_map_add, run_map_list, run_map_remove, run_mappings,
};

/// Top-level CLI for the ABK backup tool.
#[derive(Debug, Parser)]
#[command(name = "abk")]
#[command(about = "ABK: concurrent file and directory backups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Back up every configured mapping.
    Run {
        /// Copy up to N files at once (default: max_concurrency from the config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Back up a single file or directory without saving a mapping.
    Copy {
        /// File or directory to back up.
        source: PathBuf,
        /// Destination path.
        target: PathBuf,
        /// Copy up to N files at once.
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Manage the saved source-to-target mappings.
    Map {
        #[command(subcommand)]
        action: MapAction,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print the config file path and its effective contents.
    Config,
}

#[derive(Debug, Subcommand)]
pub enum MapAction {
    /// Save a new mapping.
    Add { source: PathBuf, target: PathBuf },
    /// List saved mappings with their indexes.
    List,
    /// Remove the mapping at INDEX (as shown by `map list`).
    Remove { index: usize },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { jobs } => run_mappings(&cfg, jobs).await?,
            CliCommand::Copy {
                source,
                target,
                jobs,
            } => run_copy(&cfg, &source, &target, jobs).await?,
            CliCommand::Map { action } => match action {
                MapAction::Add { source, target } => run_map_add(&mut cfg, source, target)?,
                MapAction::List => run_map_list(&cfg),
                MapAction::Remove { index } => run_map_remove(&mut cfg, index)?,
            },
            CliCommand::Checksum { path } => run_checksum(Path::new(&path)).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
