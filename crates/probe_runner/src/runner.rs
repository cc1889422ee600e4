//! Command runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CommandSpec, RunConfig};
use crate::error::RunnerResult;

/// Result of command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Unique id of this execution
    pub run_id: String,
    /// Exit code of the process (-1 when killed by a signal)
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Command runner trait.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Check if the runner can execute commands (container runtime present, etc).
    async fn is_available(&self) -> RunnerResult<bool>;

    /// Short description of how commands are executed.
    fn describe(&self) -> String;

    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit code is not an error; callers inspect
    /// [`ExecutionResult::success`].
    async fn run(&self, spec: &CommandSpec, run_config: &RunConfig)
        -> RunnerResult<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stdout: &str, stderr: &str) -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            run_id: "test".to_string(),
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_combined_output() {
        assert_eq!(result("out", "").combined_output(), "out");
        assert_eq!(result("", "err").combined_output(), "err");
        assert_eq!(result("out", "err").combined_output(), "out\nerr");
    }
}
