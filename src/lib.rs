//! # Pipeline Helper Library
//!
//! This library provides the building blocks of the `pipeline-helper`
//! command-line tool: a retry-aware git source checkout for CI pipeline steps
//! and the exponential-backoff retry policy it is built on. The heavy lifting
//! is delegated to the `git` binary; the library sequences the calls,
//! validates input, retries the network step and audits the result.
//!
//! ## Quick Example
//!
//! ```
//! use std::time::Duration;
//! use pipeline_helper::clone::CloneRequest;
//! use pipeline_helper::retry::RetryPolicy;
//!
//! let mut request = CloneRequest::new("https://github.com/org/repo");
//! request.depth = 1;
//! request.subdirectory = Some("source".to_string());
//! assert!(request.validate().is_ok());
//!
//! let policy = RetryPolicy::default()
//!     .with_base_delay(Duration::from_millis(500))
//!     .stop_on_exit_code(128);
//! assert_eq!(policy.max_attempts(), 3);
//! ```
//!
//! ## Core Concepts
//!
//! - **Retry (`retry`)**: An immutable backoff policy with stop conditions on
//!   exit codes and output patterns.
//! - **Repository Client (`repository`, `git`)**: The trait covering every
//!   git operation a checkout needs, and its implementation over the `git`
//!   CLI. Every call receives the directory and environment to run with.
//! - **Credentials (`credentials`, `environment`)**: Stages basic-auth and SSH
//!   material into a private directory and describes it as a per-command git
//!   environment.
//! - **Symlink Audit (`symlink`)**: Rejects checkouts containing links that
//!   resolve outside the tree.
//! - **Checkout (`clone`)**: The orchestrator tying the above into one run,
//!   including the optional target-branch merge.

pub mod clone;
pub mod credentials;
pub mod defaults;
pub mod environment;
pub mod error;
pub mod executor;
pub mod git;
pub mod repository;
pub mod retry;
pub mod symlink;
