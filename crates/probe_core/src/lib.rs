//! # probe_core
//!
//! Scenario engine for infraprobe.
//!
//! A scenario provisions one Terraform configuration, verifies its outputs and
//! destroys it again. This crate provides the pieces that run that lifecycle.
//!
//! # Architecture
//!
//! - **Scenarios**: Name, configuration directory and output checks
//! - **Registry**: Maps scenario names to implementations
//! - **Executor**: Runs the Provision → Verify → Teardown state machine
//! - **Suite**: Runs several scenarios with bounded parallelism
//! - **Config**: Optional `infraprobe.yaml` suite settings
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use probe_core::{ScenarioExecutor, ScenarioRegistry};
//! use probe_iac::TerraformRunner;
//! use probe_runner::{ProcessRunner, ProcessRunnerOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default())?);
//! let executor = ScenarioExecutor::new(Arc::new(TerraformRunner::new(runner)));
//!
//! let registry = ScenarioRegistry::with_builtins();
//! let scenario = registry.get_required("member-vpc")?;
//! let options = scenario.options(scenario.default_dir());
//!
//! let report = executor.run(scenario, options).await;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod registry;
pub mod report;
pub mod scenario;
pub mod scenarios;
pub mod suite;

pub use config::{ProbeConfig, ScenarioOverrides, TerraformSettings};
pub use error::{CoreError, CoreResult};
pub use executor::{ExecutorOptions, ScenarioExecutor};
pub use registry::ScenarioRegistry;
pub use report::{FailureKind, ScenarioReport, ScenarioStatus, Stage, StageOutcome, StageStatus, SuiteReport};
pub use scenario::Scenario;
pub use scenarios::MemberVpcScenario;
pub use suite::ScenarioSuite;
