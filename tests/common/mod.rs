//! Shared test utilities for integration and E2E tests.
//!
//! This module provides fixtures for building local upstream git repositories
//! and running the `pipeline-helper` binary against them.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let upstream = Upstream::new().with_commit(&[("README.md", "# hello")], "init");
//!     let workspace = TestFixture::new();
//!     workspace.clone_command(&upstream.url()).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, parse_result, TestFixture, Upstream};
}

/// Run git in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Parse the JSON result line printed on stdout.
#[allow(dead_code)]
pub fn parse_result(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|line| line.starts_with('{'))
        .expect("No JSON result on stdout");
    serde_json::from_str(line).expect("Result is not valid JSON")
}

/// A local repository acting as the remote of a clone.
///
/// The repository uses "main" as the default branch name.
#[allow(dead_code)]
pub struct Upstream {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl Upstream {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path();
        git(path, &["init", "-b", "main"]);
        git(path, &["config", "user.email", "test@example.com"]);
        git(path, &["config", "user.name", "Test User"]);
        git(path, &["config", "commit.gpgsign", "false"]);
        Self { temp_dir }
    }

    /// Write `files` and commit them on the current branch.
    pub fn with_commit(self, files: &[(&str, &str)], message: &str) -> Self {
        for (path, content) in files {
            if let Some(parent) = self.path().join(path).parent() {
                std::fs::create_dir_all(parent).expect("Failed to create directory");
            }
            self.temp_dir
                .child(path)
                .write_str(content)
                .expect("Failed to write file");
        }
        git(self.path(), &["add", "-A"]);
        git(self.path(), &["commit", "-m", message]);
        self
    }

    /// Commit a symlink at `link` pointing to `target`.
    pub fn with_symlink(self, link: &str, target: &str, message: &str) -> Self {
        std::os::unix::fs::symlink(target, self.path().join(link))
            .expect("Failed to create symlink");
        git(self.path(), &["add", "-A"]);
        git(self.path(), &["commit", "-m", message]);
        self
    }

    /// Create `branch` from the current commit and switch to it.
    pub fn with_branch(self, branch: &str) -> Self {
        git(self.path(), &["checkout", "-b", branch]);
        self
    }

    /// Switch to an existing branch.
    pub fn switch(self, branch: &str) -> Self {
        git(self.path(), &["checkout", branch]);
        self
    }

    pub fn head(&self, reference: &str) -> String {
        git(self.path(), &["rev-parse", reference])
    }

    /// `file://` URL, so shallow fetches behave as they do over the network.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// A workspace directory the binary clones into.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        if let Some(parent) = self.path().join(path).parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("pipeline-helper");
        cmd.current_dir(self.path());
        cmd
    }

    /// A `git-clone` invocation of `url` writing into this fixture.
    pub fn clone_command(&self, url: &str) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("git-clone")
            .arg("--url")
            .arg(url)
            .arg("--output-dir")
            .arg(self.path())
            .arg("--ca-bundle-path")
            .arg(self.path().join("no-ca-bundle.crt"));
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_file() {
        let fixture = TestFixture::new().with_file("test.txt", "hello");
        assert!(fixture.path().join("test.txt").exists());
    }

    #[test]
    fn test_parse_result_skips_non_json_lines() {
        let value = parse_result(b"noise\n{\"commit\":\"abc\"}\n");
        assert_eq!(value["commit"], "abc");
    }
}
