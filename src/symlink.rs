//! Symlink escape audit for checked-out trees.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A symlink whose target resolves outside the audited root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkViolation {
    pub link: PathBuf,
    pub target: PathBuf,
}

/// Walks a tree and rejects symlinks that resolve outside of it.
///
/// The audit is read-only. Broken links are reported as warnings and skipped.
#[derive(Debug, Clone)]
pub struct SymlinkAuditor {
    root: PathBuf,
}

impl SymlinkAuditor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Collect every escaping symlink without failing on them.
    pub fn scan(&self) -> Result<Vec<SymlinkViolation>> {
        // Canonical root so a symlinked temp dir (e.g. /tmp on macOS) still matches.
        let root = fs::canonicalize(&self.root)?;

        let mut violations = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.path_is_symlink() {
                continue;
            }

            let target = match fs::canonicalize(entry.path()) {
                Ok(target) => target,
                Err(_) => {
                    warn!("Broken symlink found: {}", entry.path().display());
                    continue;
                }
            };

            if !is_within(&target, &root) {
                error!(
                    "Symlink points outside repository: {} -> {}",
                    entry.path().display(),
                    target.display()
                );
                violations.push(SymlinkViolation {
                    link: entry.path().to_path_buf(),
                    target,
                });
            }
        }

        Ok(violations)
    }

    /// Fail with the number of escaping symlinks, if any.
    pub fn audit(&self) -> Result<()> {
        info!("Checking for symlinks pointing outside the repository");

        let violations = self.scan()?;
        if !violations.is_empty() {
            return Err(Error::SymlinkEscape {
                count: violations.len(),
            });
        }

        info!("Symlink check passed");
        Ok(())
    }
}

/// Component-wise prefix test, so `/repo-other` is not inside `/repo`.
fn is_within(target: &Path, root: &Path) -> bool {
    target.starts_with(root)
}
