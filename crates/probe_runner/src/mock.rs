//! Mock command runner for testing.
//!
//! Provides a scripted implementation of the CommandRunner trait for use in
//! unit tests without requiring Terraform or cloud credentials.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined mock response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl CapturedCall {
    /// Terraform-style subcommand (first argument).
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Responses returned to commands whose arguments contain all `tokens`.
///
/// Responses are consumed in order; the last one repeats.
#[derive(Debug, Clone)]
struct Rule {
    tokens: Vec<String>,
    responses: VecDeque<MockResponse>,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        self.tokens.iter().all(|t| spec.args.contains(t))
    }

    fn next(&mut self) -> MockResponse {
        if self.responses.len() > 1 {
            self.responses
                .pop_front()
                .unwrap_or_else(|| MockResponse::success(""))
        } else {
            self.responses
                .front()
                .cloned()
                .unwrap_or_else(|| MockResponse::success(""))
        }
    }
}

/// Mock command runner for testing.
///
/// Commands are matched against rules registered with [`MockRunner::on`] in
/// registration order. Unmatched commands succeed with empty output.
#[derive(Clone, Default)]
pub struct MockRunner {
    rules: Arc<RwLock<Vec<Rule>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to commands whose arguments contain all of `tokens`.
    pub fn on<I, S>(self, tokens: I, response: MockResponse) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_sequence(tokens, vec![response])
    }

    /// Respond with `responses` in order; the last one repeats.
    pub fn on_sequence<I, S>(self, tokens: I, responses: Vec<MockResponse>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.write().push(Rule {
            tokens: tokens.into_iter().map(Into::into).collect(),
            responses: responses.into(),
        });
        self
    }

    /// Make every call fail with a runner error.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Clear all captured calls.
    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get calls whose first argument is `subcommand`.
    pub fn calls_to(&self, subcommand: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.subcommand() == Some(subcommand))
            .cloned()
            .collect()
    }

    /// Check if a subcommand was invoked.
    pub fn was_called(&self, subcommand: &str) -> bool {
        !self.calls_to(subcommand).is_empty()
    }

    /// Subcommands in call order.
    pub fn subcommands(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .filter_map(|c| c.subcommand().map(str::to_string))
            .collect()
    }

    fn next_response(&self, spec: &CommandSpec) -> MockResponse {
        let mut rules = self.rules.write();
        rules
            .iter_mut()
            .find(|rule| rule.matches(spec))
            .map(Rule::next)
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(true)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        _run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        self.captured_calls.write().push(CapturedCall {
            program: spec.program.clone(),
            args: spec.args.clone(),
            env: spec.env.clone(),
            workdir: spec.workdir.clone(),
        });

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let response = self.next_response(spec);
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            run_id: format!("mock-{}", uuid::Uuid::new_v4()),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unmatched_command_succeeds() {
        let runner = MockRunner::new();
        let spec = CommandSpec::new("terraform").arg("init");

        let result = runner.run(&spec, &RunConfig::default()).await.unwrap();

        assert!(result.success());
        assert!(result.stdout.is_empty());
        assert_eq!(runner.subcommands(), vec!["init"]);
    }

    #[tokio::test]
    async fn test_rules_match_on_tokens() {
        let runner = MockRunner::new()
            .on(["output", "vpc_id"], MockResponse::success("\"vpc-1\""))
            .on(["output"], MockResponse::success("[]"));

        let vpc = CommandSpec::new("terraform").args(["output", "-json", "vpc_id"]);
        let other = CommandSpec::new("terraform").args(["output", "-json", "subnets"]);

        let r1 = runner.run(&vpc, &RunConfig::default()).await.unwrap();
        let r2 = runner.run(&other, &RunConfig::default()).await.unwrap();

        assert_eq!(r1.stdout, "\"vpc-1\"");
        assert_eq!(r2.stdout, "[]");
    }

    #[tokio::test]
    async fn test_sequence_last_response_repeats() {
        let runner = MockRunner::new().on_sequence(
            ["apply"],
            vec![
                MockResponse::failure(1, "first failed"),
                MockResponse::success("applied"),
            ],
        );
        let spec = CommandSpec::new("terraform").arg("apply");

        let r1 = runner.run(&spec, &RunConfig::default()).await.unwrap();
        let r2 = runner.run(&spec, &RunConfig::default()).await.unwrap();
        let r3 = runner.run(&spec, &RunConfig::default()).await.unwrap();

        assert_eq!(r1.exit_code, 1);
        assert_eq!(r2.stdout, "applied");
        assert_eq!(r3.stdout, "applied");
        assert_eq!(runner.calls_to("apply").len(), 3);
    }

    #[tokio::test]
    async fn test_failure_simulation() {
        let runner = MockRunner::new().simulate_failure("simulated error");
        let spec = CommandSpec::new("terraform").arg("init");

        let result = runner.run(&spec, &RunConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::ExecutionFailed(_))));
        assert_eq!(runner.call_count(), 1);
    }
}
