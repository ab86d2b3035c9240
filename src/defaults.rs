//! Default values for checkout runs.
//!
//! This module centralizes the constants shared by the library and the CLI
//! layer so that a request built in code and one built from command-line
//! flags behave the same.

use std::path::PathBuf;

/// CA bundle consulted when no explicit bundle path is configured.
pub const DEFAULT_CA_BUNDLE_PATH: &str = "/mnt/trusted-ca/ca-bundle.crt";

/// Remote registered for the source URL.
pub const ORIGIN_REMOTE: &str = "origin";

/// Remote registered when merging from a different repository.
pub const MERGE_SOURCE_REMOTE: &str = "merge-source";

/// Reference checked out after every fetch.
pub const FETCH_HEAD: &str = "FETCH_HEAD";

/// Repository-local author identity used for merge commits.
pub const MERGE_COMMIT_EMAIL: &str = "git-clone@pipeline-helper.invalid";
pub const MERGE_COMMIT_NAME: &str = "Pipeline Helper Git Clone";

pub const DEFAULT_DEPTH: i32 = 1;
pub const DEFAULT_SHORT_COMMIT_LENGTH: u32 = 7;
pub const DEFAULT_TARGET_BRANCH: &str = "main";
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 10;

/// Output directory used when none is given.
pub fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Path of the CA bundle to try, falling back to [`DEFAULT_CA_BUNDLE_PATH`].
pub fn ca_bundle_or_default(configured: Option<&PathBuf>) -> PathBuf {
    configured
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CA_BUNDLE_PATH))
}
