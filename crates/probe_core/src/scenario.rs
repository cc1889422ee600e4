//! Scenario trait.

use std::path::Path;

use async_trait::async_trait;

use probe_assert::Assertions;
use probe_iac::{Environment, TerraformOptions};

use crate::error::CoreResult;

/// A provision/verify/teardown scenario over one Terraform configuration.
///
/// Scenarios only describe *what* to check; [`crate::ScenarioExecutor`]
/// owns the lifecycle and guarantees teardown.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Unique name used on the command line and in reports.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Configuration directory used when none is configured.
    fn default_dir(&self) -> &Path;

    /// Terraform options for `dir`.
    fn options(&self, dir: &Path) -> TerraformOptions {
        TerraformOptions::new(dir).with_default_retryable_errors()
    }

    /// Read outputs from `env` and record checks.
    ///
    /// Failed checks go into `checks`; an `Err` (e.g. a missing output)
    /// stops verification. Teardown runs either way.
    async fn verify(&self, env: &Environment, checks: &mut Assertions) -> CoreResult<()>;
}
