//! # Git Clone Command Implementation
//!
//! This module implements the `git-clone` subcommand, which checks out a
//! repository into the build workspace and prints a JSON record describing the
//! checked-out commit on stdout.
//!
//! Every flag can also be supplied through a `KBC_GIT_CLONE_*` environment
//! variable, which is how pipeline steps usually pass parameters.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args};

use pipeline_helper::clone::{parse_csv, CloneOrchestrator, CloneRequest};
use pipeline_helper::defaults::{
    DEFAULT_DEPTH, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_SHORT_COMMIT_LENGTH, DEFAULT_TARGET_BRANCH,
};
use pipeline_helper::git::GitCli;
use pipeline_helper::retry::RetryPolicy;

/// Clone a git repository into the build workspace
#[derive(Args, Debug)]
pub struct GitCloneArgs {
    /// Repository URL to clone from.
    #[arg(short, long, env = "KBC_GIT_CLONE_URL")]
    pub url: String,

    /// Revision to checkout (branch, tag, sha, ref).
    #[arg(long, env = "KBC_GIT_CLONE_REVISION")]
    pub revision: Option<String>,

    /// Refspec to fetch before checking out revision.
    #[arg(long, env = "KBC_GIT_CLONE_REFSPEC")]
    pub refspec: Option<String>,

    /// Initialize and fetch git submodules.
    #[arg(long, env = "KBC_GIT_CLONE_SUBMODULES", value_name = "BOOL",
          action = ArgAction::Set, num_args = 0..=1, default_value_t = true,
          default_missing_value = "true")]
    pub submodules: bool,

    /// Comma-separated submodule paths to initialize. Empty fetches all.
    #[arg(long, env = "KBC_GIT_CLONE_SUBMODULE_PATHS", value_name = "CSV", default_value = "")]
    pub submodule_paths: String,

    /// Fetch only the most recent N commits. 0 fetches the full history.
    #[arg(long, env = "KBC_GIT_CLONE_DEPTH", default_value_t = DEFAULT_DEPTH,
          allow_negative_numbers = true)]
    pub depth: i32,

    /// Length of the short commit SHA.
    #[arg(long, env = "KBC_GIT_CLONE_SHORT_COMMIT_LENGTH",
          default_value_t = DEFAULT_SHORT_COMMIT_LENGTH)]
    pub short_commit_length: u32,

    /// Verify SSL certificates when cloning.
    #[arg(long, env = "KBC_GIT_CLONE_SSL_VERIFY", value_name = "BOOL",
          action = ArgAction::Set, num_args = 0..=1, default_value_t = true,
          default_missing_value = "true")]
    pub ssl_verify: bool,

    /// Subdirectory inside the output directory to clone the repo into.
    #[arg(long, env = "KBC_GIT_CLONE_SUBDIRECTORY")]
    pub subdirectory: Option<String>,

    /// Comma-separated directories for a sparse checkout.
    #[arg(long, env = "KBC_GIT_CLONE_SPARSE_CHECKOUT_DIRECTORIES", value_name = "CSV",
          default_value = "")]
    pub sparse_checkout_directories: String,

    /// Clean out the destination directory before cloning.
    #[arg(long, env = "KBC_GIT_CLONE_DELETE_EXISTING", value_name = "BOOL",
          action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true")]
    pub delete_existing: bool,

    /// Fail if any symlink in the checkout points outside of it.
    #[arg(long, env = "KBC_GIT_CLONE_ENABLE_SYMLINK_CHECK", value_name = "BOOL",
          action = ArgAction::Set, num_args = 0..=1, default_value_t = true,
          default_missing_value = "true")]
    pub enable_symlink_check: bool,

    /// Fetch all tags for the repo.
    #[arg(long, env = "KBC_GIT_CLONE_FETCH_TAGS", value_name = "BOOL",
          action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true")]
    pub fetch_tags: bool,

    /// Path to CA bundle file for SSL verification.
    #[arg(long, env = "KBC_GIT_CLONE_CA_BUNDLE_PATH", value_name = "FILE")]
    pub ca_bundle_path: Option<PathBuf>,

    /// Merge the target branch into the checked-out revision.
    #[arg(long, env = "KBC_GIT_CLONE_MERGE_TARGET_BRANCH", value_name = "BOOL",
          action = ArgAction::Set, num_args = 0..=1, default_value_t = false,
          default_missing_value = "true")]
    pub merge_target_branch: bool,

    /// Branch to merge into the revision when merging is enabled.
    #[arg(long, env = "KBC_GIT_CLONE_TARGET_BRANCH", default_value = DEFAULT_TARGET_BRANCH)]
    pub target_branch: String,

    /// Repository to take the target branch from. Defaults to origin.
    #[arg(long, env = "KBC_GIT_CLONE_MERGE_SOURCE_REPO_URL")]
    pub merge_source_repo_url: Option<String>,

    /// Fetch only the most recent N commits of the target branch. 0 fetches all.
    #[arg(long, env = "KBC_GIT_CLONE_MERGE_SOURCE_DEPTH", default_value_t = 0,
          allow_negative_numbers = true)]
    pub merge_source_depth: i32,

    /// Output directory the subdirectory is appended to.
    #[arg(short, long, env = "KBC_GIT_CLONE_OUTPUT_DIR", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum number of attempts for git network operations. Values below 1
    /// are raised to 1.
    #[arg(long, env = "KBC_GIT_CLONE_RETRY_MAX_ATTEMPTS",
          default_value_t = DEFAULT_RETRY_MAX_ATTEMPTS as i32,
          allow_negative_numbers = true)]
    pub retry_max_attempts: i32,

    /// Directory with basic auth credentials (.git-credentials and .gitconfig,
    /// or username and password files).
    #[arg(long, env = "KBC_GIT_CLONE_BASIC_AUTH_DIRECTORY", value_name = "DIR")]
    pub basic_auth_directory: Option<PathBuf>,

    /// Directory with SSH keys to use for git operations.
    #[arg(long, env = "KBC_GIT_CLONE_SSH_DIRECTORY", value_name = "DIR")]
    pub ssh_directory: Option<PathBuf>,

    /// Also write the JSON result to this file.
    #[arg(long, env = "KBC_GIT_CLONE_RESULT_FILE", value_name = "FILE")]
    pub result_file: Option<PathBuf>,
}

impl GitCloneArgs {
    /// Build the library request. Empty strings count as unset.
    pub fn to_request(&self) -> CloneRequest {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        let mut request = CloneRequest::new(self.url.as_str());
        request.revision = non_empty(&self.revision);
        request.refspec = non_empty(&self.refspec);
        request.depth = self.depth;
        request.submodules = self.submodules;
        request.submodule_paths = parse_csv(&self.submodule_paths);
        request.sparse_checkout_directories = parse_csv(&self.sparse_checkout_directories);
        request.output_dir = self.output_dir.clone();
        request.subdirectory = non_empty(&self.subdirectory);
        request.delete_existing = self.delete_existing;
        request.enable_symlink_check = self.enable_symlink_check;
        request.fetch_tags = self.fetch_tags;
        request.merge_target_branch = self.merge_target_branch;
        request.target_branch = self.target_branch.clone();
        request.merge_source_repo_url = non_empty(&self.merge_source_repo_url);
        request.merge_source_depth = self.merge_source_depth;
        request.retry_max_attempts = self.retry_max_attempts.max(1) as u32;
        request.short_commit_length = self.short_commit_length;
        request.basic_auth_directory = self.basic_auth_directory.clone();
        request.ssh_directory = self.ssh_directory.clone();
        request.ca_bundle_path = self.ca_bundle_path.clone();
        request.ssl_verify = self.ssl_verify;
        request
    }
}

/// Execute the `git-clone` command.
///
/// The request is validated before git is checked so that a malformed request
/// fails without any subprocess being started.
pub fn execute(args: GitCloneArgs) -> Result<()> {
    let request = args.to_request();
    request.validate()?;

    let client = GitCli::detect()?.with_retry_policy(RetryPolicy::default());
    let result = CloneOrchestrator::new(request, Box::new(client)).run()?;

    println!("{}", result.to_json()?);
    if let Some(path) = &args.result_file {
        result.write_to(path)?;
    }

    Ok(())
}
