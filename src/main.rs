//! # Pipeline Helper CLI
//!
//! This is the binary entry point for the `pipeline-helper` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Returning any error from `main` so the process exits non-zero with the
//!   error on stderr.
//!
//! The checkout logic lives in the `pipeline_helper` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
