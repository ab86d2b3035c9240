//! # Source Checkout
//!
//! [`CloneOrchestrator`] drives a [`RepositoryClient`] through one checkout
//! run. Each step only starts once the previous one succeeded:
//!
//! 1. validate the [`CloneRequest`]
//! 2. stage credentials into a private directory
//! 3. prepare the checkout directory, emptying it first if requested
//! 4. `init`, optional sparse checkout, `remote add origin`
//! 5. fetch (the only retried step) and check out `FETCH_HEAD`
//! 6. optional submodule update
//! 7. optional merge of the target branch ([`merge`])
//! 8. optional symlink audit of the final tree
//! 9. gather commit information into the [`CloneResult`]
//! 10. optional tag fetch
//!
//! A failed step ends the run. Whatever was already written to the checkout
//! directory is left in place for inspection.

pub mod merge;
pub mod request;
pub mod result;
pub mod workspace;

pub use merge::{normalize_git_url, MergeCoordinator};
pub use request::{parse_csv, CloneRequest};
pub use result::CloneResult;

use log::info;
use url::Url;

use crate::credentials::CredentialProvisioner;
use crate::defaults::{FETCH_HEAD, ORIGIN_REMOTE};
use crate::error::Result;
use crate::repository::{FetchSpec, RepoContext, RepositoryClient};
use crate::symlink::SymlinkAuditor;

/// Replace any userinfo in `raw` with `***` for logging.
///
/// Strings that do not parse as URLs, or carry no userinfo, are returned
/// unchanged.
pub fn sanitize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    if parsed.username().is_empty() && parsed.password().is_none() {
        return raw.to_string();
    }
    if parsed.set_password(None).is_err() || parsed.set_username("***").is_err() {
        return raw.to_string();
    }
    parsed.to_string()
}

/// Runs one checkout from a [`CloneRequest`] to a [`CloneResult`].
pub struct CloneOrchestrator {
    client: Box<dyn RepositoryClient>,
    request: CloneRequest,
}

impl CloneOrchestrator {
    pub fn new(request: CloneRequest, client: Box<dyn RepositoryClient>) -> Self {
        Self { client, request }
    }

    pub fn request(&self) -> &CloneRequest {
        &self.request
    }

    /// Run every step and return the result record.
    pub fn run(&self) -> Result<CloneResult> {
        self.log_params();
        self.request.validate()?;

        let staged = CredentialProvisioner::new(self.request.url.as_str())
            .basic_auth_dir(self.request.basic_auth_directory.clone())
            .ssh_dir(self.request.ssh_directory.clone())
            .ca_bundle(self.request.ca_bundle_path.clone())
            .ssl_verify(self.request.ssl_verify)
            .stage()?;

        let checkout_dir = self.request.checkout_dir();
        if self.request.delete_existing {
            workspace::clean_checkout_dir(&checkout_dir)?;
        }
        workspace::prepare_checkout_dir(&checkout_dir)?;

        let ctx = RepoContext::new(checkout_dir, staged.env().clone());
        self.perform_clone(&ctx)?;

        let merged_sha = if self.request.merge_target_branch {
            let coordinator = MergeCoordinator::new(self.client.as_ref(), &ctx);
            Some(coordinator.merge(&self.request)?)
        } else {
            None
        };

        if self.request.enable_symlink_check {
            SymlinkAuditor::new(ctx.dir()).audit()?;
        }

        let result = self.gather_commit_info(&ctx, merged_sha)?;

        if self.request.fetch_tags {
            let tags = self.client.fetch_tags(&ctx)?;
            info!("Fetched {} tag(s)", tags.len());
        }

        Ok(result)
    }

    fn perform_clone(&self, ctx: &RepoContext) -> Result<()> {
        info!("Initializing git repository");
        self.client.init(ctx)?;

        if !self.request.sparse_checkout_directories.is_empty() {
            self.client.set_sparse_checkout(ctx, &self.request.sparse_checkout_directories)?;
        }

        info!("Adding remote origin: {}", sanitize_url(&self.request.url));
        self.client.remote_add(ctx, ORIGIN_REMOTE, &self.request.url)?;

        let refspec = self.request.fetch_refspec();
        info!(
            "Fetching from origin (depth={}, refspec={})",
            self.request.depth,
            refspec.unwrap_or_default()
        );
        let spec = FetchSpec::new(ORIGIN_REMOTE)
            .refspec(refspec)
            .depth(self.request.fetch_depth())
            .submodules(self.request.submodules)
            .max_attempts(self.request.fetch_attempts());
        self.client.fetch_with_refspec(ctx, &spec)?;

        info!("Checking out {}", FETCH_HEAD);
        self.client.checkout(ctx, FETCH_HEAD)?;

        if self.request.submodules {
            info!("Updating submodules");
            self.client.submodule_update(
                ctx,
                true,
                self.request.fetch_depth(),
                &self.request.submodule_paths,
            )?;
        }

        Ok(())
    }

    fn gather_commit_info(
        &self,
        ctx: &RepoContext,
        merged_sha: Option<String>,
    ) -> Result<CloneResult> {
        let commit = self.client.rev_parse(ctx, "HEAD", false, 0)?;
        let short_commit =
            self.client.rev_parse(ctx, "HEAD", true, self.request.short_commit_length)?;
        let timestamp = self.client.log(ctx, "%ct", 1)?;

        info!("Commit: {}", commit);
        info!("Short commit: {}", short_commit);
        info!("Commit timestamp: {}", timestamp);

        Ok(CloneResult::new(
            self.request.url.as_str(),
            commit,
            short_commit,
            timestamp,
            merged_sha,
        ))
    }

    fn log_params(&self) {
        let r = &self.request;
        info!("[param] URL: {}", sanitize_url(&r.url));
        info!("[param] Depth: {}", r.depth);
        info!("[param] Submodules: {}", r.submodules);
        info!("[param] SSL verify: {}", r.ssl_verify);
        info!("[param] Output dir: {}", r.output_dir.display());
        info!("[param] Delete existing: {}", r.delete_existing);
        info!("[param] Enable symlink check: {}", r.enable_symlink_check);
        info!("[param] Fetch tags: {}", r.fetch_tags);
        info!("[param] Merge target branch: {}", r.merge_target_branch);
        info!("[param] Short commit length: {}", r.short_commit_length);
        info!("[param] Retry max attempts: {}", r.retry_max_attempts);

        if let Some(revision) = &r.revision {
            info!("[param] Revision: {}", revision);
        }
        if let Some(refspec) = &r.refspec {
            info!("[param] Refspec: {}", refspec);
        }
        if !r.submodule_paths.is_empty() {
            info!("[param] Submodule paths: {}", r.submodule_paths.join(","));
        }
        if let Some(subdirectory) = &r.subdirectory {
            info!("[param] Subdirectory: {}", subdirectory);
        }
        if !r.sparse_checkout_directories.is_empty() {
            info!(
                "[param] Sparse checkout directories: {}",
                r.sparse_checkout_directories.join(",")
            );
        }
        if r.merge_target_branch {
            info!("[param] Target branch: {}", r.target_branch);
        }
        if let Some(url) = &r.merge_source_repo_url {
            info!("[param] Merge source repo URL: {}", sanitize_url(url));
        }
        if r.merge_source_depth != 0 {
            info!("[param] Merge source depth: {}", r.merge_source_depth);
        }
        if let Some(dir) = &r.basic_auth_directory {
            info!("[param] Basic auth directory: {}", dir.display());
        }
        if let Some(dir) = &r.ssh_directory {
            info!("[param] SSH directory: {}", dir.display());
        }
        if let Some(path) = &r.ca_bundle_path {
            info!("[param] CA bundle path: {}", path.display());
        }
    }
}
