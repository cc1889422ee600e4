//! Scenario suite with bounded parallelism.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info};

use probe_assert::AssertionReport;
use probe_iac::TerraformOptions;

use crate::executor::ScenarioExecutor;
use crate::report::{ScenarioReport, ScenarioStatus, Stage, StageOutcome, SuiteReport};
use crate::scenario::Scenario;

/// Runs scenarios concurrently, at most `parallelism` at a time.
///
/// Each scenario still runs its own lifecycle sequentially. Reports come back
/// in the order scenarios were added.
pub struct ScenarioSuite {
    executor: Arc<ScenarioExecutor>,
    parallelism: usize,
    entries: Vec<(Arc<dyn Scenario>, TerraformOptions)>,
}

impl ScenarioSuite {
    pub fn new(executor: Arc<ScenarioExecutor>, parallelism: usize) -> Self {
        Self {
            executor,
            parallelism: parallelism.max(1),
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, scenario: Arc<dyn Scenario>, options: TerraformOptions) {
        self.entries.push((scenario, options));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn run(self) -> SuiteReport {
        info!(
            "Running {} scenario(s) with parallelism {}",
            self.entries.len(),
            self.parallelism
        );

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();
        let mut task_index: HashMap<Id, usize> = HashMap::with_capacity(self.entries.len());
        let mut slots: Vec<Option<ScenarioReport>> = Vec::with_capacity(self.entries.len());
        let mut labels = Vec::with_capacity(self.entries.len());

        for (index, (scenario, options)) in self.entries.into_iter().enumerate() {
            slots.push(None);
            labels.push((
                scenario.name().to_string(),
                options.terraform_dir.display().to_string(),
            ));

            let executor = self.executor.clone();
            let semaphore = semaphore.clone();
            let handle = tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                executor.run(scenario, options).await
            });
            task_index.insert(handle.id(), index);
        }

        let mut aborted: HashMap<usize, String> = HashMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, report)) => {
                    if let Some(&index) = task_index.get(&id) {
                        slots[index] = Some(report);
                    }
                }
                Err(e) => {
                    let id = e.id();
                    let message = join_error_message(e);
                    error!("Scenario task aborted: {}", message);
                    if let Some(&index) = task_index.get(&id) {
                        aborted.insert(index, message);
                    }
                }
            }
        }

        let scenarios = slots
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (slot, (name, dir)))| {
                slot.unwrap_or_else(|| {
                    let message = aborted
                        .remove(&index)
                        .unwrap_or_else(|| "scenario task aborted".to_string());
                    aborted_report(name, dir, message)
                })
            })
            .collect();

        SuiteReport { scenarios }
    }
}

fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    match e.into_panic().downcast::<String>() {
        Ok(message) => format!("scenario panicked: {}", message),
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => format!("scenario panicked: {}", message),
            Err(_) => "scenario panicked".to_string(),
        },
    }
}

fn aborted_report(scenario: String, terraform_dir: String, message: String) -> ScenarioReport {
    let now = Utc::now();
    ScenarioReport {
        scenario,
        environment_id: String::new(),
        terraform_dir,
        status: ScenarioStatus::Failed,
        stages: vec![StageOutcome::failed(Stage::Verify, message)],
        assertions: AssertionReport::default(),
        started_at: now,
        finished_at: now,
        duration_ms: 0,
    }
}
