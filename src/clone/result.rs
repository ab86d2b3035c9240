//! The record produced by a successful checkout run.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::Result;

/// Commit information about the checked-out tree.
///
/// `CHAINS-GIT_URL` and `CHAINS-GIT_COMMIT` repeat `url` and `commit` under
/// the names provenance tooling expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneResult {
    pub commit: String,
    #[serde(rename = "shortCommit")]
    pub short_commit: String,
    pub url: String,
    #[serde(rename = "commitTimestamp")]
    pub commit_timestamp: String,
    #[serde(rename = "mergedSha", skip_serializing_if = "Option::is_none")]
    pub merged_sha: Option<String>,
    #[serde(rename = "CHAINS-GIT_URL")]
    pub chains_git_url: String,
    #[serde(rename = "CHAINS-GIT_COMMIT")]
    pub chains_git_commit: String,
}

impl CloneResult {
    pub fn new(
        url: impl Into<String>,
        commit: impl Into<String>,
        short_commit: impl Into<String>,
        commit_timestamp: impl Into<String>,
        merged_sha: Option<String>,
    ) -> Self {
        let url = url.into();
        let commit = commit.into();
        Self {
            chains_git_url: url.clone(),
            chains_git_commit: commit.clone(),
            commit,
            short_commit: short_commit.into(),
            url,
            commit_timestamp: commit_timestamp.into(),
            merged_sha,
        }
    }

    /// Compact single-line JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the JSON form to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, &json)?;
        debug!("Wrote result into '{}':\n{}", path.display(), json);
        Ok(())
    }
}
