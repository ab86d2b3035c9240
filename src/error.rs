//! # Error Handling
//!
//! This module defines the centralized error type for `pipeline-helper`. It
//! uses the `thiserror` library to build a single `Error` enum covering every
//! failure mode of a checkout run, each variant carrying enough context to
//! diagnose a failure without re-running the step.
//!
//! ## Taxonomy
//!
//! - **`Validation`**: the request is malformed. Raised before any side effect
//!   and never retried.
//! - **`Spawn`**: the delegate binary could not be started at all.
//! - **`CommandFailed`**: the delegate ran and exited non-zero. Only the fetch
//!   step retries on this; everywhere else it is fatal.
//! - **`RetryExhausted`**: the fetch failed on every permitted attempt or hit a
//!   stop condition.
//! - **`SymlinkEscape`**: the checked-out tree contains links that resolve
//!   outside of it.
//! - **`AuthFormat`**: a basic-auth directory holds neither recognized shape.
//!
//! Wrapped library errors (`Io`, `UrlParse`, `Regex`, `Json`) round out the
//! enum so `?` works across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline-helper operations
#[derive(Error, Debug)]
pub enum Error {
    /// The clone request failed validation.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// The delegate program could not be started.
    #[error("Failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    /// The delegate program ran and exited with a non-zero status.
    ///
    /// Includes the operation name, the directory it ran in, the exit code and
    /// whatever the program wrote to stderr.
    #[error("{operation} failed in {} with exit code {exit_code} (stderr: {stderr})", dir.display())]
    CommandFailed {
        operation: String,
        dir: PathBuf,
        exit_code: i32,
        stderr: String,
    },

    /// A retried operation never succeeded.
    #[error("{operation} failed after {attempts} attempt(s) with exit code {exit_code} (stderr: {stderr})")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        exit_code: i32,
        stderr: String,
    },

    /// One or more symlinks in the checkout resolve outside of it.
    #[error("found {count} symlink(s) pointing outside the repository")]
    SymlinkEscape { count: usize },

    /// The basic-auth directory does not contain a supported layout.
    #[error("unknown basic-auth workspace format in {}: expected .git-credentials/.gitconfig or username/password files", dir.display())]
    AuthFormat { dir: PathBuf },

    /// The installed git is older than the minimum supported release, or its
    /// version could not be recognized.
    #[error("unsupported git version '{found}': {required} or newer is required")]
    UnsupportedGitVersion { found: String, required: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
