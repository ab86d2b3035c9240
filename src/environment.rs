//! Per-invocation git environment
//!
//! Git has no per-call API for TLS settings, credential configuration or the
//! SSH command, so these are passed as environment variables. Instead of
//! mutating the helper's own process environment, the values are collected in
//! an immutable [`GitEnvironment`] that travels with every repository call and
//! is applied only to the `Command` that is about to be spawned.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Disables TLS certificate verification when set to `true`.
pub const GIT_SSL_NO_VERIFY: &str = "GIT_SSL_NO_VERIFY";
/// Path to a CA bundle used for TLS verification.
pub const GIT_SSL_CAINFO: &str = "GIT_SSL_CAINFO";
/// Replaces `~/.gitconfig` as the global configuration file.
pub const GIT_CONFIG_GLOBAL: &str = "GIT_CONFIG_GLOBAL";
/// Command used by git in place of `ssh`.
pub const GIT_SSH_COMMAND: &str = "GIT_SSH_COMMAND";
/// Stops git from prompting on the terminal for credentials.
pub const GIT_TERMINAL_PROMPT: &str = "GIT_TERMINAL_PROMPT";

/// Environment overrides applied to every git invocation of a run.
///
/// Built once while staging credentials and read-only afterwards. Each
/// `with_*` method returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitEnvironment {
    ssl_verify: bool,
    ca_bundle: Option<PathBuf>,
    git_config: Option<PathBuf>,
    ssh_command: Option<String>,
}

impl Default for GitEnvironment {
    fn default() -> Self {
        Self {
            ssl_verify: true,
            ca_bundle: None,
            git_config: None,
            ssh_command: None,
        }
    }
}

impl GitEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ssl_verify(self, ssl_verify: bool) -> Self {
        Self { ssl_verify, ..self }
    }

    pub fn with_ca_bundle(self, path: impl Into<PathBuf>) -> Self {
        Self {
            ca_bundle: Some(path.into()),
            ..self
        }
    }

    pub fn with_git_config(self, path: impl Into<PathBuf>) -> Self {
        Self {
            git_config: Some(path.into()),
            ..self
        }
    }

    pub fn with_ssh_command(self, command: impl Into<String>) -> Self {
        Self {
            ssh_command: Some(command.into()),
            ..self
        }
    }

    pub fn ssl_verify(&self) -> bool {
        self.ssl_verify
    }

    pub fn ca_bundle(&self) -> Option<&Path> {
        self.ca_bundle.as_deref()
    }

    pub fn git_config(&self) -> Option<&Path> {
        self.git_config.as_deref()
    }

    pub fn ssh_command(&self) -> Option<&str> {
        self.ssh_command.as_deref()
    }

    /// Collapse the settings into the variables git reads.
    ///
    /// Only variables with a value are emitted, plus `GIT_TERMINAL_PROMPT=0`
    /// which is always set so a missing credential fails instead of hanging.
    pub fn vars(&self) -> Vec<(&'static str, OsString)> {
        let mut vars = vec![(GIT_TERMINAL_PROMPT, OsString::from("0"))];
        if !self.ssl_verify {
            vars.push((GIT_SSL_NO_VERIFY, OsString::from("true")));
        }
        if let Some(ca_bundle) = &self.ca_bundle {
            vars.push((GIT_SSL_CAINFO, ca_bundle.clone().into_os_string()));
        }
        if let Some(git_config) = &self.git_config {
            vars.push((GIT_CONFIG_GLOBAL, git_config.clone().into_os_string()));
        }
        if let Some(ssh_command) = &self.ssh_command {
            vars.push((GIT_SSH_COMMAND, OsString::from(ssh_command)));
        }
        vars
    }
}
