//! # Repository Client
//!
//! This module defines [`RepositoryClient`], the seam between the checkout
//! orchestrator and the version-control tool. Every operation the orchestrator
//! needs is one method on the trait, and each method receives a
//! [`RepoContext`] naming the working directory and the environment to run
//! with. Nothing relies on the process working directory or on global git
//! configuration.
//!
//! The production implementation is [`GitCli`](crate::git::GitCli), which
//! shells out to the `git` binary. Tests substitute in-memory fakes that record
//! the calls they receive and answer from canned responses.

use std::path::{Path, PathBuf};

use crate::environment::GitEnvironment;
use crate::error::Result;

/// Working directory and environment for one repository operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    dir: PathBuf,
    env: GitEnvironment,
}

impl RepoContext {
    pub fn new(dir: impl Into<PathBuf>, env: GitEnvironment) -> Self {
        Self {
            dir: dir.into(),
            env,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn env(&self) -> &GitEnvironment {
        &self.env
    }
}

/// What to fetch and how hard to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    /// Remote name to fetch from.
    pub remote: String,
    /// Refspec to fetch; `None` fetches the remote's default.
    pub refspec: Option<String>,
    /// History depth; 0 fetches everything.
    pub depth: u32,
    /// Also fetch submodule objects.
    pub submodules: bool,
    /// Upper bound on fetch attempts.
    pub max_attempts: u32,
}

impl FetchSpec {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            refspec: None,
            depth: 0,
            submodules: false,
            max_attempts: 1,
        }
    }

    pub fn refspec(mut self, refspec: Option<impl Into<String>>) -> Self {
        self.refspec = refspec.map(Into::into).filter(|r: &String| !r.is_empty());
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn submodules(mut self, submodules: bool) -> Self {
        self.submodules = submodules;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Version-control operations used by a checkout run.
///
/// Every method fails with an error that carries the exit status and captured
/// stderr when the underlying tool exits non-zero.
pub trait RepositoryClient: Send + Sync {
    /// Create an empty repository in the context directory.
    fn init(&self, ctx: &RepoContext) -> Result<()>;

    /// Register a remote. Fails if `name` is already registered.
    fn remote_add(&self, ctx: &RepoContext, name: &str, url: &str) -> Result<String>;

    /// Enable sparse checkout limited to `directories`. Fails on an empty list.
    fn set_sparse_checkout(&self, ctx: &RepoContext, directories: &[String]) -> Result<()>;

    /// Fetch from a remote, force-updating local refs, with retries.
    fn fetch_with_refspec(&self, ctx: &RepoContext, spec: &FetchSpec) -> Result<()>;

    /// Move the working tree to `reference`.
    fn checkout(&self, ctx: &RepoContext, reference: &str) -> Result<()>;

    /// Recursively materialize submodules, optionally shallow and limited to
    /// `paths`.
    fn submodule_update(
        &self,
        ctx: &RepoContext,
        init: bool,
        depth: u32,
        paths: &[String],
    ) -> Result<()>;

    /// Set a repository-local configuration value.
    fn config_local(&self, ctx: &RepoContext, key: &str, value: &str) -> Result<()>;

    /// Resolve `reference` to a commit id.
    ///
    /// With `short` set the id is abbreviated to `length` characters, or to the
    /// tool's default abbreviation when `length` is 0.
    fn rev_parse(&self, ctx: &RepoContext, reference: &str, short: bool, length: u32)
        -> Result<String>;

    /// Render the most recent `count` log entries with `format`.
    fn log(&self, ctx: &RepoContext, format: &str, count: u32) -> Result<String>;

    /// Commit the pending merge with a descriptive message.
    fn commit(
        &self,
        ctx: &RepoContext,
        target_branch: &str,
        remote: &str,
        result_sha: &str,
    ) -> Result<String>;

    /// Merge `fetch_head` into the current tree without committing.
    fn merge(&self, ctx: &RepoContext, fetch_head: &str) -> Result<String>;

    /// Fetch every tag from the default remote and list them.
    fn fetch_tags(&self, ctx: &RepoContext) -> Result<Vec<String>>;
}
