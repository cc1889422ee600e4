//! # probe_iac
//!
//! Terraform lifecycle driver for infraprobe.
//!
//! This crate runs `terraform init/apply/output/destroy` through a
//! [`probe_runner::CommandRunner`], retries transient failures, and wraps a
//! provisioned configuration in an [`Environment`] handle whose teardown runs
//! exactly once.
//!
//! ## Features
//!
//! - Terraform options with variables, var files and environment
//! - Retry on known transient errors (provider downloads, timeouts, 429s)
//! - JSON output parsing for scalar, list and map outputs
//! - Scoped environments destroyed on every exit path, including panics
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use probe_iac::{scoped, TerraformOptions, TerraformRunner};
//! use probe_runner::{ProcessRunner, ProcessRunnerOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default())?);
//! let terraform = Arc::new(TerraformRunner::new(runner));
//! let options = TerraformOptions::new("./unit-test").with_default_retryable_errors();
//!
//! let outcome = scoped(terraform, options, |env| async move {
//!     env.output("vpc_id").await
//! })
//! .await;
//! println!("teardown ok: {}", outcome.teardown.is_ok());
//! # Ok(())
//! # }
//! ```

pub mod environment;
pub mod error;
pub mod options;
pub mod provisioner;
pub mod terraform;

pub use environment::{scoped, Environment, ScopedOutcome};
pub use error::{IacError, IacResult};
pub use options::{default_retryable_errors, validate_config_dir, TerraformOptions};
pub use provisioner::Provisioner;
pub use terraform::{TerraformCommand, TerraformRunner};
