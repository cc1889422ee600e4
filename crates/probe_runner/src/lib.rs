//! # probe_runner
//!
//! Command execution wrapper for infraprobe.
//!
//! Every external tool infraprobe drives (Terraform, OpenTofu) is executed
//! through the [`CommandRunner`] trait, either as a local process or inside a
//! Docker/Podman container.
//!
//! # Features
//!
//! - **Execution Modes**: local process or `docker run`/`podman run` wrapper
//! - **Runtime Detection**: Auto-detect Docker vs Podman in container mode
//! - **Dry-Run Mode**: Log commands without execution
//! - **CI Integration**: Timestamped log streaming for CI systems
//! - **Timeouts**: Kill commands that exceed their budget
//! - **Mock Runner**: Scripted responses for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use probe_runner::{CommandRunner, CommandSpec, ProcessRunner, ProcessRunnerOptions, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new(ProcessRunnerOptions::default())?;
//!
//!     let spec = CommandSpec::new("terraform")
//!         .workdir("./unit-test")
//!         .args(["version", "-json"]);
//!
//!     let result = runner.run(&spec, &RunConfig::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{CommandSpec, ContainerImage, ContainerRuntime, ExecutionMode, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::{LogHandler, LogLine, LogStream, ProcessRunner, ProcessRunnerOptions};
pub use runner::{CommandRunner, ExecutionResult};
