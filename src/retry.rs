//! # Retry Policy
//!
//! Exponential-backoff retries for delegate invocations.
//!
//! A [`RetryPolicy`] runs an operation until it succeeds or one of the stop
//! conditions is met:
//!
//! - the maximum number of attempts is reached,
//! - the process exited with one of the configured stop exit codes,
//! - stdout or stderr matched one of the configured stop patterns.
//!
//! No delay precedes the first attempt and none follows the last permitted
//! one. After the first failure the policy waits `base_delay`; each further
//! failure multiplies the delay by `delay_factor`, clamped to `max_delay` when
//! one is set.
//!
//! Policies are immutable values. Every builder method consumes the policy and
//! returns a new one, so a preset can be cloned and specialized per call site:
//!
//! ```
//! use pipeline_helper::retry::RetryPolicy;
//!
//! let registry = RetryPolicy::image_registry();
//! let quick = registry.clone().with_max_attempts(2);
//! assert_eq!(registry.max_attempts(), 10);
//! assert_eq!(quick.max_attempts(), 2);
//! ```

use std::fmt;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use regex::Regex;

use crate::error::{Error, Result};
use crate::executor::{CommandOutput, NO_EXIT_CODE};

/// A condition on process output that ends retrying early.
#[derive(Debug, Clone)]
enum StopPattern {
    /// Case-insensitive substring, stored lowercased.
    Contains(String),
    Matches(Regex),
}

impl StopPattern {
    fn is_match(&self, text: &str) -> bool {
        match self {
            StopPattern::Contains(needle) => text.to_lowercase().contains(needle.as_str()),
            StopPattern::Matches(regex) => regex.is_match(text),
        }
    }
}

impl fmt::Display for StopPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPattern::Contains(needle) => write!(f, "contains {:?}", needle),
            StopPattern::Matches(regex) => write!(f, "matches /{}/", regex.as_str()),
        }
    }
}

/// Why [`RetryPolicy::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last attempt succeeded.
    Succeeded,
    /// The last attempt exited with a configured stop exit code.
    ExitCode(i32),
    /// The last attempt's output matched a configured stop pattern.
    OutputMatched(String),
    /// Every permitted attempt failed.
    AttemptsExhausted,
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryOutcome {
    /// The result of the last attempt.
    pub result: Result<CommandOutput>,
    /// How many times the operation ran.
    pub attempts: u32,
    pub stop: StopReason,
}

impl RetryOutcome {
    /// Turn the outcome into the last successful output, or an error naming
    /// `operation`.
    ///
    /// A process that could not be started keeps its original
    /// [`Error::Spawn`]; a process that kept exiting non-zero becomes
    /// [`Error::RetryExhausted`].
    pub fn into_output(self, operation: &str) -> Result<CommandOutput> {
        let output = self.result?;
        if output.success() {
            return Ok(output);
        }
        Err(Error::RetryExhausted {
            operation: operation.to_string(),
            attempts: self.attempts,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Backoff and stop-condition configuration for retrying an operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
    delay_factor: f64,
    max_attempts: u32,
    max_delay: Option<Duration>,
    stop_exit_codes: Vec<i32>,
    stop_patterns: Vec<StopPattern>,
    enabled: bool,
}

impl Default for RetryPolicy {
    /// General purpose preset: 1s base delay doubling on each failure, 3
    /// attempts, no delay ceiling.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            delay_factor: 2.0,
            max_attempts: 3,
            max_delay: None,
            stop_exit_codes: Vec::new(),
            stop_patterns: Vec::new(),
            enabled: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for talking to image registries, which rate limit aggressively:
    /// 10 attempts with the delay capped at 4 minutes.
    pub fn image_registry() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            delay_factor: 2.0,
            max_attempts: 10,
            max_delay: Some(Duration::from_secs(4 * 60)),
            ..Self::default()
        }
    }

    /// Run the operation exactly once with no delay, regardless of the other
    /// settings.
    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    /// Delay after the first failure.
    pub fn with_base_delay(self, base_delay: Duration) -> Self {
        Self { base_delay, ..self }
    }

    /// Multiplier applied to the delay after each failure. Negative or
    /// non-finite factors are treated as zero.
    pub fn with_delay_factor(self, delay_factor: f64) -> Self {
        let delay_factor = if delay_factor.is_finite() && delay_factor > 0.0 {
            delay_factor
        } else {
            0.0
        };
        Self {
            delay_factor,
            ..self
        }
    }

    /// Wait the same `delay` after every failure.
    pub fn with_constant_delay(self, delay: Duration) -> Self {
        Self {
            base_delay: delay,
            delay_factor: 1.0,
            ..self
        }
    }

    /// Maximum number of attempts. Values below 1 are raised to 1.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }

    /// Ceiling for the delay between attempts.
    pub fn with_max_delay(self, max_delay: Duration) -> Self {
        Self {
            max_delay: Some(max_delay),
            ..self
        }
    }

    /// Stop retrying when the process exits with `exit_code`.
    pub fn stop_on_exit_code(self, exit_code: i32) -> Self {
        self.stop_on_exit_codes([exit_code])
    }

    /// Stop retrying when the process exits with any of `exit_codes`.
    pub fn stop_on_exit_codes(mut self, exit_codes: impl IntoIterator<Item = i32>) -> Self {
        self.stop_exit_codes.extend(exit_codes);
        self
    }

    /// Stop retrying when stdout or stderr matches the regular expression.
    pub fn stop_if_output_matches(mut self, pattern: &str) -> Result<Self> {
        self.stop_patterns.push(StopPattern::Matches(Regex::new(pattern)?));
        Ok(self)
    }

    /// Stop retrying when stdout or stderr contains `text`, ignoring case.
    pub fn stop_if_output_contains(mut self, text: &str) -> Self {
        self.stop_patterns.push(StopPattern::Contains(text.to_lowercase()));
        self
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn delay_factor(&self) -> f64 {
        self.delay_factor
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run `operation` under this policy, sleeping on the current thread
    /// between attempts.
    pub fn run<F>(&self, operation: F) -> RetryOutcome
    where
        F: FnMut() -> Result<CommandOutput>,
    {
        self.run_with_sleep(operation, thread::sleep)
    }

    /// Like [`run`](Self::run) but with the delay delegated to `sleep`.
    pub fn run_with_sleep<F, S>(&self, mut operation: F, mut sleep: S) -> RetryOutcome
    where
        F: FnMut() -> Result<CommandOutput>,
        S: FnMut(Duration),
    {
        if !self.enabled {
            let result = operation();
            let stop = match &result {
                Ok(output) if output.success() => StopReason::Succeeded,
                _ => StopReason::AttemptsExhausted,
            };
            return RetryOutcome {
                result,
                attempts: 1,
                stop,
            };
        }

        debug!(
            "Running with max attempts {}, {:?} base delay, {:.2} delay factor",
            self.max_attempts, self.base_delay, self.delay_factor
        );

        let mut delay = self.base_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = operation();
            if matches!(&result, Ok(output) if output.success()) {
                return RetryOutcome {
                    result,
                    attempts: attempt,
                    stop: StopReason::Succeeded,
                };
            }

            let (exit_code, stdout, stderr) = match &result {
                Ok(output) => (
                    output.exit_code,
                    output.stdout.as_str(),
                    output.stderr.as_str(),
                ),
                Err(_) => (NO_EXIT_CODE, "", ""),
            };

            if let Some(stop) = self.stop_condition(exit_code, stdout, stderr) {
                debug!("Stopping retries after attempt {}: {:?}", attempt, stop);
                return RetryOutcome {
                    result,
                    attempts: attempt,
                    stop,
                };
            }

            if attempt >= self.max_attempts {
                debug!(
                    "Attempt {} failed, output:\n[stdout]:\n{}\n[stderr]:\n{}",
                    attempt, stdout, stderr
                );
                info!("Giving up on command after {} attempts", attempt);
                return RetryOutcome {
                    result,
                    attempts: attempt,
                    stop: StopReason::AttemptsExhausted,
                };
            }

            debug!(
                "Attempt {} failed, output:\n[stdout]:\n{}\n[stderr]:\n{}\nWaiting {:?} before next retry",
                attempt, stdout, stderr, delay
            );
            sleep(delay);
            delay = self.next_delay(delay);
        }
    }

    fn stop_condition(&self, exit_code: i32, stdout: &str, stderr: &str) -> Option<StopReason> {
        if self.stop_exit_codes.contains(&exit_code) {
            return Some(StopReason::ExitCode(exit_code));
        }
        self.stop_patterns
            .iter()
            .find(|pattern| pattern.is_match(stdout) || pattern.is_match(stderr))
            .map(|pattern| StopReason::OutputMatched(pattern.to_string()))
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        // Whole nanoseconds stay exact in f64 for any realistic delay.
        let nanos = delay.as_nanos() as f64 * self.delay_factor;
        let next = if nanos >= u64::MAX as f64 {
            Duration::from_nanos(u64::MAX)
        } else {
            Duration::from_nanos(nanos as u64)
        };
        match self.max_delay {
            Some(max_delay) if next > max_delay => max_delay,
            _ => next,
        }
    }
}
