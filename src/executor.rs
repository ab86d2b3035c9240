//! Subprocess execution
//!
//! Every delegate invocation goes through the [`CommandRunner`] trait so the
//! git wrapper can be tested against canned outputs without a real binary.
//! [`SystemRunner`] is the implementation backed by `std::process::Command`.

use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Exit code reported when a process could not be started or was killed by a
/// signal.
pub const NO_EXIT_CODE: i32 = -1;

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs.
///
/// Returns `Err(Error::Spawn)` only when the program could not be started. A
/// non-zero exit is reported through [`CommandOutput::exit_code`] and left to
/// the caller to interpret.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        dir: Option<&Path>,
        envs: &[(&'static str, OsString)],
    ) -> Result<CommandOutput>;
}

/// A [`CommandRunner`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        dir: Option<&Path>,
        envs: &[(&'static str, OsString)],
    ) -> Result<CommandOutput> {
        match dir {
            Some(dir) => debug!(
                "[command]: {} {} (in {})",
                program,
                args.join(" "),
                dir.display()
            ),
            None => debug!("[command]: {} {}", program, args.join(" ")),
        }

        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        for (key, value) in envs {
            command.env(key, value);
        }

        let output = command.output().map_err(|e| Error::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(NO_EXIT_CODE),
        })
    }
}

/// Check whether `program` resolves to an executable on `PATH`.
pub fn is_available(program: &str) -> bool {
    is_available_in(program, env::var_os("PATH"))
}

fn is_available_in(program: &str, paths: Option<OsString>) -> bool {
    let cwd = env::current_dir().unwrap_or_default();
    which::which_in(program, paths, cwd).is_ok()
}
