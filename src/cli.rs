//! CLI argument parsing and command dispatch

use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Pipeline Helper - Build pipeline steps around external tools
#[derive(Parser, Debug)]
#[command(name = "pipeline-helper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone a git repository into the build workspace
    GitClone(commands::git_clone::GitCloneArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level)?;

        match self.command {
            Commands::GitClone(args) => commands::git_clone::execute(args),
        }
    }
}

/// Route `log` output to stderr so stdout only carries results.
fn init_logging(level: &str) -> Result<()> {
    let filter = LevelFilter::from_str(level).map_err(|_| {
        anyhow!(
            "Invalid log level '{}': expected error, warn, info, debug or trace",
            level
        )
    })?;

    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
