//! Merging the target branch into the checked-out revision.

use log::{info, warn};

use crate::clone::request::CloneRequest;
use crate::defaults::{MERGE_COMMIT_EMAIL, MERGE_COMMIT_NAME, MERGE_SOURCE_REMOTE, ORIGIN_REMOTE};
use crate::error::Result;
use crate::repository::{FetchSpec, RepoContext, RepositoryClient};

/// Strip a trailing `/` and then a trailing `.git`.
pub fn normalize_git_url(url: &str) -> &str {
    let url = url.strip_suffix('/').unwrap_or(url);
    url.strip_suffix(".git").unwrap_or(url)
}

/// Remote to fetch the target branch from.
///
/// Origin is reused when there is no separate source or it names the same
/// repository; otherwise a dedicated remote is registered.
pub fn select_merge_remote(origin_url: &str, merge_source_url: Option<&str>) -> &'static str {
    match merge_source_url.filter(|url| !url.is_empty()) {
        Some(source) if normalize_git_url(source) != normalize_git_url(origin_url) => {
            MERGE_SOURCE_REMOTE
        }
        _ => ORIGIN_REMOTE,
    }
}

/// Runs the merge workflow in one checkout.
pub struct MergeCoordinator<'a> {
    client: &'a dyn RepositoryClient,
    ctx: &'a RepoContext,
}

impl<'a> MergeCoordinator<'a> {
    pub fn new(client: &'a dyn RepositoryClient, ctx: &'a RepoContext) -> Self {
        Self { client, ctx }
    }

    /// Fetch and merge the target branch, returning the merge commit id.
    pub fn merge(&self, request: &CloneRequest) -> Result<String> {
        if request.depth == 1 {
            warn!("Shallow clone with depth=1 may cause merge conflicts due to insufficient commit history.");
        }
        if request.merge_source_depth == 1 {
            warn!("Shallow fetch with merge-source-depth=1 may cause merge conflicts due to insufficient commit history.");
        }

        let merge_source = request
            .merge_source_repo_url
            .as_deref()
            .filter(|url| !url.is_empty());
        let remote = select_merge_remote(&request.url, merge_source);
        match merge_source {
            Some(source) if remote == MERGE_SOURCE_REMOTE => {
                info!("Merging from different repository: '{}'", source);
                info!("Adding remote '{}'...", remote);
                let added = self.client.remote_add(self.ctx, remote, source)?;
                info!("Remote add: {}", added);
            }
            Some(_) => {
                info!("Merge source URL is the same as origin. Using existing 'origin' remote.")
            }
            None => {}
        }

        let spec = FetchSpec::new(remote)
            .refspec(Some(request.target_branch.as_str()))
            .depth(request.merge_fetch_depth())
            .submodules(false)
            .max_attempts(request.fetch_attempts());
        self.client.fetch_with_refspec(self.ctx, &spec)?;

        self.client.config_local(self.ctx, "user.email", MERGE_COMMIT_EMAIL)?;
        self.client.config_local(self.ctx, "user.name", MERGE_COMMIT_NAME)?;

        let pre_merge = self.client.rev_parse(self.ctx, "HEAD", false, 0)?;

        let merge_ref = format!("{}/{}", remote, request.target_branch);
        let merged = self.client.merge(self.ctx, &merge_ref)?;
        info!("Merge: {}", merged);

        let committed = self
            .client
            .commit(self.ctx, &request.target_branch, remote, &pre_merge)?;
        info!("Commit: {}", committed);

        self.client.rev_parse(self.ctx, "HEAD", false, 0)
    }
}
