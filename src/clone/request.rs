//! The input of one checkout run.

use std::path::{Component, Path, PathBuf};

use crate::defaults::{
    default_output_dir, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_SHORT_COMMIT_LENGTH,
    DEFAULT_TARGET_BRANCH,
};
use crate::error::{Error, Result};

/// Everything a checkout run needs to know, fixed before the run starts.
///
/// `CloneRequest::new` gives the library defaults: full history, no
/// submodules, symlink audit on, 7-character short ids and 10 fetch attempts.
/// The CLI layer overrides these from its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    /// Repository to clone. Echoed verbatim into the result.
    pub url: String,
    /// Branch, tag or commit to fetch when no refspec is given.
    pub revision: Option<String>,
    /// Refspec to fetch. Takes precedence over `revision`.
    pub refspec: Option<String>,
    /// History depth for the fetch; 0 means full history.
    pub depth: i32,
    pub submodules: bool,
    /// Restrict submodule materialization to these paths. Empty means all.
    pub submodule_paths: Vec<String>,
    /// Enables sparse checkout limited to these directories when non-empty.
    pub sparse_checkout_directories: Vec<String>,
    pub output_dir: PathBuf,
    /// Relative path under `output_dir` to check out into.
    pub subdirectory: Option<String>,
    /// Empty the checkout directory before cloning.
    pub delete_existing: bool,
    pub enable_symlink_check: bool,
    pub fetch_tags: bool,
    /// Merge `target_branch` into the checked-out revision.
    pub merge_target_branch: bool,
    pub target_branch: String,
    /// Repository to take `target_branch` from. `None` means origin.
    pub merge_source_repo_url: Option<String>,
    /// History depth for the target branch fetch; 0 means full history.
    pub merge_source_depth: i32,
    /// Ceiling on fetch attempts, raised to 1 when lower.
    pub retry_max_attempts: u32,
    pub short_commit_length: u32,
    pub basic_auth_directory: Option<PathBuf>,
    pub ssh_directory: Option<PathBuf>,
    pub ca_bundle_path: Option<PathBuf>,
    pub ssl_verify: bool,
}

impl CloneRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            revision: None,
            refspec: None,
            depth: 0,
            submodules: false,
            submodule_paths: Vec::new(),
            sparse_checkout_directories: Vec::new(),
            output_dir: default_output_dir(),
            subdirectory: None,
            delete_existing: false,
            enable_symlink_check: true,
            fetch_tags: false,
            merge_target_branch: false,
            target_branch: DEFAULT_TARGET_BRANCH.to_string(),
            merge_source_repo_url: None,
            merge_source_depth: 0,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            short_commit_length: DEFAULT_SHORT_COMMIT_LENGTH,
            basic_auth_directory: None,
            ssh_directory: None,
            ca_bundle_path: None,
            ssl_verify: true,
        }
    }

    /// Reject malformed requests. Has no side effects.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::validation("url parameter is required"));
        }
        if self.depth < 0 {
            return Err(Error::validation(
                "depth must be >= 0 (0 means full history)",
            ));
        }
        if self.merge_source_depth < 0 {
            return Err(Error::validation(
                "merge-source-depth must be >= 0 (0 means full history)",
            ));
        }

        if let Some(subdirectory) = self.subdirectory.as_deref() {
            let path = Path::new(subdirectory);
            if path.is_absolute() || path.has_root() {
                return Err(Error::validation(format!(
                    "subdirectory must be a relative path, got absolute path: {}",
                    subdirectory
                )));
            }
            if path.components().any(|c| c == Component::ParentDir) {
                return Err(Error::validation(format!(
                    "subdirectory must not contain path traversal (..): {}",
                    subdirectory
                )));
            }
        }

        Ok(())
    }

    /// `output_dir` joined with the subdirectory, if any.
    pub fn checkout_dir(&self) -> PathBuf {
        match self.subdirectory.as_deref() {
            Some(subdirectory) if !subdirectory.is_empty() => self.output_dir.join(subdirectory),
            _ => self.output_dir.clone(),
        }
    }

    /// What the origin fetch asks for: the refspec, else the revision.
    pub fn fetch_refspec(&self) -> Option<&str> {
        self.refspec
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| self.revision.as_deref().filter(|r| !r.is_empty()))
    }

    /// Validated depth as an unsigned count.
    pub(crate) fn fetch_depth(&self) -> u32 {
        u32::try_from(self.depth).unwrap_or(0)
    }

    pub(crate) fn merge_fetch_depth(&self) -> u32 {
        u32::try_from(self.merge_source_depth).unwrap_or(0)
    }

    pub(crate) fn fetch_attempts(&self) -> u32 {
        self.retry_max_attempts.max(1)
    }
}

/// Split a comma-separated parameter, trimming entries and dropping empties.
pub fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
