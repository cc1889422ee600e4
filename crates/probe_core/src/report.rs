//! Scenario and suite reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use probe_assert::{AssertionFailure, AssertionReport};

/// Lifecycle stage of a scenario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Provision,
    Verify,
    Teardown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Provision => write!(f, "provision"),
            Stage::Verify => write!(f, "verify"),
            Stage::Teardown => write!(f, "teardown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Outcome of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub message: Option<String>,
}

impl StageOutcome {
    pub fn succeeded(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Succeeded,
            message: None,
        }
    }

    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            message: Some(message.into()),
        }
    }

    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            message: Some(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

/// Primary reason a scenario failed, in precedence order.
///
/// A teardown failure only counts when nothing earlier failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Provision,
    Assertion,
    Teardown,
}

/// Result of running one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub environment_id: String,
    pub terraform_dir: String,
    pub status: ScenarioStatus,
    pub stages: Vec<StageOutcome>,
    pub assertions: AssertionReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn failures(&self) -> Vec<AssertionFailure> {
        self.assertions.failures()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        let failed = |stage| self.stage(stage).map_or(false, StageOutcome::is_failed);
        if failed(Stage::Provision) {
            Some(FailureKind::Provision)
        } else if failed(Stage::Verify) {
            Some(FailureKind::Assertion)
        } else if failed(Stage::Teardown) {
            Some(FailureKind::Teardown)
        } else {
            None
        }
    }

    /// One-line summary, e.g. `member-vpc: passed (6/6 checks passed)`.
    pub fn summary(&self) -> String {
        let status = match self.status {
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed => "failed",
        };
        format!("{}: {} ({})", self.scenario, status, self.assertions.summary())
    }
}

/// Result of running a suite of scenarios.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().filter(|r| !r.passed()).count()
    }

    /// Most severe failure across all scenarios.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.scenarios
            .iter()
            .filter_map(ScenarioReport::failure_kind)
            .min()
    }
}
