//! # CLI Command Implementations
//!
//! Each subcommand of the `pipeline-helper` tool lives in its own module with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `pipeline_helper` library.

pub mod git_clone;
