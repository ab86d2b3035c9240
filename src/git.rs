use log::{debug, info};
use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};
use crate::executor::{is_available, CommandOutput, CommandRunner, SystemRunner};
use crate::repository::{FetchSpec, RepoContext, RepositoryClient};
use crate::retry::RetryPolicy;

/// Oldest git release with `git sparse-checkout set`.
pub const MIN_GIT_VERSION: Version = Version::new(2, 25, 0);

const GIT: &str = "git";

/// Parse the output of `git --version`
///
/// Vendor suffixes such as `(Apple Git-145)` or `.windows.1` are ignored.
pub fn parse_git_version(output: &str) -> Result<Version> {
    let regex = Regex::new(r"git version (\d+)\.(\d+)\.(\d+)")?;
    let unsupported = || Error::UnsupportedGitVersion {
        found: output.trim().to_string(),
        required: MIN_GIT_VERSION.to_string(),
    };
    let captures = regex.captures(output).ok_or_else(unsupported)?;

    let part = |i: usize| -> Result<u64> {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(unsupported)
    };
    Ok(Version::new(part(1)?, part(2)?, part(3)?))
}

/// [`RepositoryClient`] backed by the `git` command line.
///
/// Each operation spawns one `git` process in the context directory with the
/// context environment applied to that process only.
pub struct GitCli {
    runner: Box<dyn CommandRunner>,
    retry: RetryPolicy,
}

impl GitCli {
    /// Wrap `runner` without probing the installed git.
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            retry: RetryPolicy::default(),
        }
    }

    /// Locate the system git and check that it is recent enough.
    pub fn detect() -> Result<Self> {
        if !is_available(GIT) {
            return Err(Error::Spawn {
                program: GIT.to_string(),
                message: "git CLI is not available".to_string(),
            });
        }
        Self::with_version_check(Box::new(SystemRunner))
    }

    /// Wrap `runner` after verifying `git --version` meets [`MIN_GIT_VERSION`].
    pub fn with_version_check(runner: Box<dyn CommandRunner>) -> Result<Self> {
        let output = runner.run(GIT, &["--version".to_string()], None, &[])?;
        if !output.success() {
            return Err(Error::Spawn {
                program: GIT.to_string(),
                message: format!("failed to get git version: {}", output.stderr.trim()),
            });
        }

        let version = parse_git_version(&output.stdout)?;
        if version < MIN_GIT_VERSION {
            return Err(Error::UnsupportedGitVersion {
                found: version.to_string(),
                required: MIN_GIT_VERSION.to_string(),
            });
        }
        debug!("Using git {}", version);

        Ok(Self::new(runner))
    }

    /// Base policy that fetches specialize with their attempt ceiling.
    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    fn spawn(&self, ctx: &RepoContext, args: &[String]) -> Result<CommandOutput> {
        self.runner.run(GIT, args, Some(ctx.dir()), &ctx.env().vars())
    }

    /// Run git once and turn a non-zero exit into [`Error::CommandFailed`].
    fn git(&self, ctx: &RepoContext, operation: &str, args: Vec<String>) -> Result<CommandOutput> {
        let output = self.spawn(ctx, &args)?;
        if !output.success() {
            return Err(Error::CommandFailed {
                operation: operation.to_string(),
                dir: ctx.dir().to_path_buf(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RepositoryClient for GitCli {
    fn init(&self, ctx: &RepoContext) -> Result<()> {
        self.git(ctx, "git init", strings(["init"]))?;
        Ok(())
    }

    fn remote_add(&self, ctx: &RepoContext, name: &str, url: &str) -> Result<String> {
        let output = self.git(ctx, "git remote add", strings(["remote", "add", name, url]))?;
        Ok(output.stdout.trim().to_string())
    }

    fn set_sparse_checkout(&self, ctx: &RepoContext, directories: &[String]) -> Result<()> {
        if directories.is_empty() {
            return Err(Error::validation(
                "sparse checkout directories parameter empty",
            ));
        }
        info!("Configuring sparse checkout: {:?}", directories);

        self.config_local(ctx, "core.sparseCheckout", "true")?;

        let mut args = strings(["sparse-checkout", "set"]);
        args.extend(directories.iter().cloned());
        self.git(ctx, "git sparse-checkout set", args)?;
        Ok(())
    }

    fn fetch_with_refspec(&self, ctx: &RepoContext, spec: &FetchSpec) -> Result<()> {
        let mut args = strings(["fetch"]);
        if spec.submodules {
            args.push("--recurse-submodules=yes".to_string());
        }
        if spec.depth > 0 {
            args.push(format!("--depth={}", spec.depth));
        }
        args.extend(strings([spec.remote.as_str(), "--update-head-ok", "--force"]));
        if let Some(refspec) = &spec.refspec {
            args.push(refspec.clone());
        }

        self.retry
            .clone()
            .with_max_attempts(spec.max_attempts)
            .run(|| self.spawn(ctx, &args))
            .into_output("git fetch")?;
        Ok(())
    }

    fn checkout(&self, ctx: &RepoContext, reference: &str) -> Result<()> {
        self.git(ctx, "git checkout", strings(["checkout", reference]))?;
        Ok(())
    }

    fn submodule_update(
        &self,
        ctx: &RepoContext,
        init: bool,
        depth: u32,
        paths: &[String],
    ) -> Result<()> {
        let mut args = strings(["submodule", "update", "--recursive"]);
        if init {
            args.push("--init".to_string());
        }
        args.push("--force".to_string());
        if depth > 0 {
            args.push(format!("--depth={}", depth));
        }
        args.extend(paths.iter().cloned());

        self.git(ctx, "git submodule update", args)?;
        Ok(())
    }

    fn config_local(&self, ctx: &RepoContext, key: &str, value: &str) -> Result<()> {
        self.git(ctx, "git config", strings(["config", "--local", key, value]))?;
        Ok(())
    }

    fn rev_parse(
        &self,
        ctx: &RepoContext,
        reference: &str,
        short: bool,
        length: u32,
    ) -> Result<String> {
        let mut args = strings(["rev-parse"]);
        if short {
            if length > 0 {
                args.push(format!("--short={}", length));
            } else {
                args.push("--short".to_string());
            }
        }
        args.push(reference.to_string());

        let output = self.git(ctx, "git rev-parse", args)?;
        Ok(output.stdout.trim().to_string())
    }

    fn log(&self, ctx: &RepoContext, format: &str, count: u32) -> Result<String> {
        let args = vec![
            "log".to_string(),
            format!("-{}", count),
            format!("--pretty=format:{}", format),
        ];
        let output = self.git(ctx, "git log", args)?;
        Ok(output.stdout.trim().to_string())
    }

    fn commit(
        &self,
        ctx: &RepoContext,
        target_branch: &str,
        remote: &str,
        result_sha: &str,
    ) -> Result<String> {
        let message = format!(
            "Merge branch '{}' from {} into {}",
            target_branch, remote, result_sha
        );
        let output = self.git(ctx, "git commit", strings(["commit", "-m", &message]))?;
        Ok(output.stdout.trim().to_string())
    }

    fn merge(&self, ctx: &RepoContext, fetch_head: &str) -> Result<String> {
        let args = strings([
            "merge",
            fetch_head,
            "--no-commit",
            "--no-ff",
            "--allow-unrelated-histories",
        ]);
        let output = self.git(ctx, "git merge", args)?;
        Ok(output.stdout.trim().to_string())
    }

    fn fetch_tags(&self, ctx: &RepoContext) -> Result<Vec<String>> {
        self.git(ctx, "git fetch --tags", strings(["fetch", "--tags"]))?;
        let output = self.git(ctx, "git tag -l", strings(["tag", "-l"]))?;

        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect())
    }
}
