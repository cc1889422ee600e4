//! Scenario executor: the Provision → Verify → Teardown state machine.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use probe_assert::Assertions;
use probe_iac::{scoped, Provisioner, TerraformOptions};

use crate::report::{ScenarioReport, ScenarioStatus, Stage, StageOutcome};
use crate::scenario::Scenario;

/// Executor behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Skip the Verify stage (dry runs produce no outputs to read).
    pub skip_verify: bool,
}

/// Runs scenarios against a [`Provisioner`].
pub struct ScenarioExecutor {
    provisioner: Arc<dyn Provisioner>,
    options: ExecutorOptions,
}

impl ScenarioExecutor {
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one scenario to completion.
    ///
    /// Never returns early: provisioning failures, verification errors and
    /// teardown failures all end up in the report. Teardown is invoked
    /// exactly once.
    pub async fn run(
        &self,
        scenario: Arc<dyn Scenario>,
        options: TerraformOptions,
    ) -> ScenarioReport {
        let started_at = Utc::now();
        let terraform_dir = options.terraform_dir.display().to_string();
        let skip_verify = self.options.skip_verify;

        info!("Starting scenario {} in {}", scenario.name(), terraform_dir);

        let outcome = scoped(self.provisioner.clone(), options, |env| {
            let scenario = scenario.clone();
            async move {
                let mut checks = Assertions::new();
                if skip_verify {
                    return (checks, None);
                }
                let result = scenario.verify(&env, &mut checks).await;
                (checks, Some(result))
            }
        })
        .await;

        let mut stages = Vec::with_capacity(3);
        let mut checks_report = Assertions::new().finish();

        match &outcome.provision {
            Ok(()) => stages.push(StageOutcome::succeeded(Stage::Provision)),
            Err(e) => {
                error!("Scenario {} failed to provision: {}", scenario.name(), e);
                stages.push(StageOutcome::failed(Stage::Provision, e.to_string()));
            }
        }

        let verify = match outcome.body {
            None => StageOutcome::skipped(Stage::Verify, "provisioning failed"),
            Some(Err(panic)) => {
                error!("Scenario {} panicked during verification: {}", scenario.name(), panic);
                StageOutcome::failed(Stage::Verify, format!("verification panicked: {}", panic))
            }
            Some(Ok((checks, result))) => {
                checks_report = checks.finish();
                match result {
                    None => StageOutcome::skipped(Stage::Verify, "verification disabled"),
                    Some(Err(e)) => {
                        error!("Scenario {} verification error: {}", scenario.name(), e);
                        StageOutcome::failed(Stage::Verify, e.to_string())
                    }
                    Some(Ok(())) if !checks_report.passed => StageOutcome::failed(
                        Stage::Verify,
                        format!("{} assertion(s) failed", checks_report.failed_count()),
                    ),
                    Some(Ok(())) => StageOutcome::succeeded(Stage::Verify),
                }
            }
        };
        stages.push(verify);

        match &outcome.teardown {
            Ok(()) => stages.push(StageOutcome::succeeded(Stage::Teardown)),
            Err(e) => {
                warn!("Scenario {} teardown failed: {}", scenario.name(), e);
                stages.push(StageOutcome::failed(Stage::Teardown, e.to_string()));
            }
        }

        let status = if stages.iter().any(StageOutcome::is_failed) {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };

        let finished_at = Utc::now();
        let report = ScenarioReport {
            scenario: scenario.name().to_string(),
            environment_id: outcome.environment_id.to_string(),
            terraform_dir,
            status,
            stages,
            assertions: checks_report,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        };

        info!("{}", report.summary());
        report
    }
}
