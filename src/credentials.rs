//! # Credential Staging
//!
//! Authentication material mounted into a pipeline step is copied into a
//! private staging directory owned by the current run. The git configuration
//! and SSH command that point at the staged files are returned as a
//! [`GitEnvironment`]; nothing is written under the invoking user's home
//! directory and no global git configuration is touched.
//!
//! ## Basic auth
//!
//! Two directory layouts are recognized:
//!
//! - **credential store**: `.git-credentials` plus `.gitconfig`. Both are
//!   copied and every `helper = store` line of the config is rewritten to
//!   name the staged credentials file explicitly.
//! - **username/password**: the shape of a Kubernetes `basic-auth` secret.
//!   A credentials file and a minimal config scoped to the source URL's host
//!   are synthesized.
//!
//! Any other layout is an [`Error::AuthFormat`].
//!
//! ## SSH
//!
//! Regular files of the SSH directory are copied into `<staging>/.ssh`. The
//! resulting `GIT_SSH_COMMAND` passes every `id_*` private key with `-i` and
//! the staged `known_hosts`, when present, through `UserKnownHostsFile`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::TempDir;
use url::Url;

use crate::defaults::ca_bundle_or_default;
use crate::environment::GitEnvironment;
use crate::error::{Error, Result};

const GIT_CREDENTIALS: &str = ".git-credentials";
const GIT_CONFIG: &str = ".gitconfig";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const SSH_DIR: &str = ".ssh";
const KNOWN_HOSTS: &str = "known_hosts";

const PRIVATE_FILE_MODE: u32 = 0o400;
const PRIVATE_DIR_MODE: u32 = 0o700;

/// Credentials staged for one run.
///
/// The staging directory is removed when this value is dropped, so it must
/// outlive every git invocation that uses [`env`](Self::env).
#[derive(Debug)]
pub struct StagedCredentials {
    dir: TempDir,
    env: GitEnvironment,
}

impl StagedCredentials {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn env(&self) -> &GitEnvironment {
        &self.env
    }
}

/// Stages TLS settings and optional basic-auth or SSH material.
#[derive(Debug, Clone)]
pub struct CredentialProvisioner {
    source_url: String,
    basic_auth_dir: Option<PathBuf>,
    ssh_dir: Option<PathBuf>,
    ca_bundle: Option<PathBuf>,
    ssl_verify: bool,
}

impl CredentialProvisioner {
    /// `source_url` supplies the host for synthesized username/password
    /// credentials.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            basic_auth_dir: None,
            ssh_dir: None,
            ca_bundle: None,
            ssl_verify: true,
        }
    }

    pub fn basic_auth_dir(self, dir: Option<PathBuf>) -> Self {
        Self {
            basic_auth_dir: dir,
            ..self
        }
    }

    pub fn ssh_dir(self, dir: Option<PathBuf>) -> Self {
        Self {
            ssh_dir: dir,
            ..self
        }
    }

    pub fn ca_bundle(self, path: Option<PathBuf>) -> Self {
        Self {
            ca_bundle: path,
            ..self
        }
    }

    pub fn ssl_verify(self, ssl_verify: bool) -> Self {
        Self { ssl_verify, ..self }
    }

    /// Create a fresh private directory and stage everything into it.
    pub fn stage(&self) -> Result<StagedCredentials> {
        let dir = tempfile::Builder::new()
            .prefix("pipeline-helper-")
            .tempdir()?;
        let env = self.stage_into(dir.path())?;
        Ok(StagedCredentials { dir, env })
    }

    /// Stage into an existing private directory and return the environment
    /// that points at it.
    pub fn stage_into(&self, private_dir: &Path) -> Result<GitEnvironment> {
        let mut env = GitEnvironment::new();

        if !self.ssl_verify {
            info!("Disabling SSL verification (GIT_SSL_NO_VERIFY=true)");
            env = env.with_ssl_verify(false);
        }

        let ca_bundle = ca_bundle_or_default(self.ca_bundle.as_ref());
        if ca_bundle.exists() {
            info!("Using mounted CA bundle: {}", ca_bundle.display());
            env = env.with_ca_bundle(ca_bundle);
        }

        if let Some(auth_dir) = &self.basic_auth_dir {
            if let Some(git_config) = self.stage_basic_auth(auth_dir, private_dir)? {
                env = env.with_git_config(git_config);
            }
        }

        if let Some(ssh_dir) = &self.ssh_dir {
            if let Some(ssh_command) = stage_ssh(ssh_dir, private_dir)? {
                env = env.with_ssh_command(ssh_command);
            }
        }

        Ok(env)
    }

    /// Returns the staged `.gitconfig`, or `None` when `auth_dir` is absent.
    fn stage_basic_auth(&self, auth_dir: &Path, private_dir: &Path) -> Result<Option<PathBuf>> {
        if !auth_dir.exists() {
            warn!("Basic auth directory not found: {}", auth_dir.display());
            return Ok(None);
        }

        let dest_credentials = private_dir.join(GIT_CREDENTIALS);
        let dest_config = private_dir.join(GIT_CONFIG);

        let src_credentials = auth_dir.join(GIT_CREDENTIALS);
        let src_config = auth_dir.join(GIT_CONFIG);
        if src_credentials.is_file() && src_config.is_file() {
            info!("Setting up basic auth from .git-credentials and .gitconfig");

            let credentials = fs::read(&src_credentials)?;
            write_private(&dest_credentials, &credentials)?;

            let config = fs::read_to_string(&src_config)?;
            let rewritten = rewrite_credential_helper(&config, &dest_credentials);
            write_private(&dest_config, rewritten.as_bytes())?;

            info!("Basic auth credentials configured");
            return Ok(Some(dest_config));
        }

        let username_path = auth_dir.join(USERNAME);
        let password_path = auth_dir.join(PASSWORD);
        if username_path.is_file() && password_path.is_file() {
            info!("Setting up basic auth from username/password files");

            let username = fs::read_to_string(&username_path)?;
            let password = fs::read_to_string(&password_path)?;
            let host = url_host(&self.source_url)?;

            let credentials = format!("https://{}:{}@{}\n", username.trim(), password.trim(), host);
            write_private(&dest_credentials, credentials.as_bytes())?;

            let config = format!(
                "[credential \"https://{}\"]\n  helper = store --file={}\n",
                host,
                dest_credentials.display()
            );
            write_private(&dest_config, config.as_bytes())?;

            info!("Basic auth credentials configured for {}", host);
            return Ok(Some(dest_config));
        }

        Err(Error::AuthFormat {
            dir: auth_dir.to_path_buf(),
        })
    }
}

/// Point every bare `helper = store` line at `credentials_path`, keeping its
/// indentation.
pub fn rewrite_credential_helper(config: &str, credentials_path: &Path) -> String {
    config
        .split('\n')
        .map(|line| {
            if line.trim() == "helper = store" {
                let rest = line.trim_start_matches([' ', '\t']);
                let indent = &line[..line.len() - rest.len()];
                format!(
                    "{}helper = store --file={}",
                    indent,
                    credentials_path.display()
                )
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Host and optional port of `url`, as used in a credential-store line.
fn url_host(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let host = parsed.host_str().unwrap_or_default();
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Copy the SSH material and build the matching `GIT_SSH_COMMAND`.
fn stage_ssh(ssh_dir: &Path, private_dir: &Path) -> Result<Option<String>> {
    if !ssh_dir.exists() {
        warn!("SSH directory not found: {}", ssh_dir.display());
        return Ok(None);
    }
    info!("Setting up SSH keys from {}", ssh_dir.display());

    let dest_dir = private_dir.join(SSH_DIR);
    fs::create_dir_all(&dest_dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dest_dir, fs::Permissions::from_mode(PRIVATE_DIR_MODE))?;
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(ssh_dir)? {
        let entry = entry?;
        // Follows links so mounted secrets (files linked through `..data`) are copied.
        if fs::metadata(entry.path())?.is_file() {
            names.push(entry.file_name());
        }
    }
    names.sort();

    let mut command = String::from("ssh");
    for name in &names {
        let dest = dest_dir.join(name);
        let contents = fs::read(ssh_dir.join(name))?;
        write_private(&dest, &contents)?;

        let name = name.to_string_lossy();
        if name.starts_with("id_") && !name.ends_with(".pub") {
            command.push_str(&format!(" -i {}", dest.display()));
        }
    }

    let known_hosts = dest_dir.join(KNOWN_HOSTS);
    if known_hosts.is_file() {
        command.push_str(&format!(
            " -o UserKnownHostsFile={}",
            known_hosts.display()
        ));
    }

    info!("SSH keys configured (GIT_SSH_COMMAND={})", command);
    Ok(Some(command))
}

/// Write `contents` to `path`, readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(PRIVATE_FILE_MODE))?;
    }
    Ok(())
}
