//! Check outcomes and the aggregated assertion report.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a single check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
}

/// Outcome of one assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: String,
    pub status: CheckStatus,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: Option<String>,
}

impl CheckOutcome {
    pub fn passed(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            status: CheckStatus::Passed,
            expected: None,
            actual: None,
            message: None,
        }
    }

    pub fn failed(
        check: impl Into<String>,
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            status: CheckStatus::Failed,
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            message: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }
}

/// A failed assertion with the literal and expected values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    pub check: String,
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (expected: {}, actual: {})",
            self.check, self.message, self.expected, self.actual
        )
    }
}

/// All checks recorded during one verification pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssertionReport {
    pub checks: Vec<CheckOutcome>,
    pub passed: bool,
}

impl AssertionReport {
    pub fn new(checks: Vec<CheckOutcome>) -> Self {
        let passed = checks.iter().all(|c| !c.is_failed());
        Self { checks, passed }
    }

    pub fn failures(&self) -> Vec<AssertionFailure> {
        self.checks
            .iter()
            .filter(|c| c.is_failed())
            .map(|c| AssertionFailure {
                check: c.check.clone(),
                message: c.message.clone().unwrap_or_default(),
                expected: c.expected.clone().unwrap_or_default(),
                actual: c.actual.clone().unwrap_or_default(),
            })
            .collect()
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.is_failed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count()
    }

    /// One-line summary, e.g. `5/6 checks passed`.
    pub fn summary(&self) -> String {
        format!("{}/{} checks passed", self.passed_count(), self.checks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = AssertionReport::new(vec![
            CheckOutcome::passed("a"),
            CheckOutcome::failed("b", "values differ", "1", "2"),
            CheckOutcome::passed("c"),
        ]);

        assert!(!report.passed);
        assert_eq!(report.passed_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.summary(), "2/3 checks passed");
    }

    #[test]
    fn test_failure_display() {
        let report = AssertionReport::new(vec![CheckOutcome::failed(
            "Secondary CIDR should be 192.168.16.0/20",
            "values differ",
            "\"192.168.16.0/20\"",
            "\"10.1.0.0/16\"",
        )]);

        let failures = report.failures();
        assert_eq!(
            failures[0].to_string(),
            "Secondary CIDR should be 192.168.16.0/20: values differ \
             (expected: \"192.168.16.0/20\", actual: \"10.1.0.0/16\")"
        );
    }

    #[test]
    fn test_empty_report_passes() {
        assert!(AssertionReport::new(Vec::new()).passed);
    }
}
