//! Assertion collector.

use std::fmt::Debug;

use regex::Regex;
use tracing::{debug, warn};

use crate::report::{AssertionReport, CheckOutcome};

/// Records checks without aborting on failure.
///
/// Each method returns whether the check passed so callers can guard
/// dependent checks.
#[derive(Debug, Default)]
pub struct Assertions {
    checks: Vec<CheckOutcome>,
}

impl Assertions {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, outcome: CheckOutcome) -> bool {
        let passed = !outcome.is_failed();
        if passed {
            debug!("check passed: {}", outcome.check);
        } else {
            warn!(
                "check failed: {} (expected: {}, actual: {})",
                outcome.check,
                outcome.expected.as_deref().unwrap_or_default(),
                outcome.actual.as_deref().unwrap_or_default()
            );
        }
        self.checks.push(outcome);
        passed
    }

    /// `actual` contains `needle`.
    pub fn contains(&mut self, check: impl Into<String>, actual: &str, needle: &str) -> bool {
        let outcome = if actual.contains(needle) {
            CheckOutcome::passed(check)
        } else {
            CheckOutcome::failed(
                check,
                format!("{:?} does not contain {:?}", actual, needle),
                format!("contains {:?}", needle),
                format!("{:?}", actual),
            )
        };
        self.record(outcome)
    }

    /// `actual` matches `pattern` anywhere (unanchored search).
    ///
    /// An invalid pattern is recorded as a failed check.
    pub fn matches(&mut self, check: impl Into<String>, actual: &str, pattern: &str) -> bool {
        match Regex::new(pattern) {
            Ok(re) => self.matches_regex(check, actual, &re),
            Err(e) => self.record(CheckOutcome::failed(
                check,
                format!("invalid pattern: {}", e),
                format!("matches /{}/", pattern),
                format!("{:?}", actual),
            )),
        }
    }

    pub fn matches_regex(&mut self, check: impl Into<String>, actual: &str, re: &Regex) -> bool {
        let outcome = if re.is_match(actual) {
            CheckOutcome::passed(check)
        } else {
            CheckOutcome::failed(
                check,
                format!("{:?} does not match /{}/", actual, re.as_str()),
                format!("matches /{}/", re.as_str()),
                format!("{:?}", actual),
            )
        };
        self.record(outcome)
    }

    pub fn equal<T: PartialEq + Debug>(
        &mut self,
        check: impl Into<String>,
        expected: T,
        actual: T,
    ) -> bool {
        let outcome = if expected == actual {
            CheckOutcome::passed(check)
        } else {
            CheckOutcome::failed(
                check,
                "values differ",
                format!("{:?}", expected),
                format!("{:?}", actual),
            )
        };
        self.record(outcome)
    }

    /// `actual > bound`.
    pub fn greater<T: PartialOrd + Debug>(
        &mut self,
        check: impl Into<String>,
        actual: T,
        bound: T,
    ) -> bool {
        let outcome = if actual > bound {
            CheckOutcome::passed(check)
        } else {
            CheckOutcome::failed(
                check,
                format!("{:?} is not greater than {:?}", actual, bound),
                format!("> {:?}", bound),
                format!("{:?}", actual),
            )
        };
        self.record(outcome)
    }

    /// Collection has exactly `expected` elements.
    pub fn len_eq<T: Debug>(&mut self, check: impl Into<String>, items: &[T], expected: usize) -> bool {
        let outcome = if items.len() == expected {
            CheckOutcome::passed(check)
        } else {
            CheckOutcome::failed(
                check,
                format!("should have {} item(s), has {}", expected, items.len()),
                format!("len {}", expected),
                format!("len {}: {:?}", items.len(), items),
            )
        };
        self.record(outcome)
    }

    /// Record an unconditional failure.
    pub fn fail(
        &mut self,
        check: impl Into<String>,
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) {
        self.record(CheckOutcome::failed(check, message, expected, actual));
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_failed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn finish(self) -> AssertionReport {
        AssertionReport::new(self.checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let mut checks = Assertions::new();
        assert!(checks.contains("has prefix", "vpc-0abc", "vpc-"));
        assert!(!checks.contains("has prefix", "sg-0abc", "vpc-"));

        let report = checks.finish();
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].expected, "contains \"vpc-\"");
        assert_eq!(failures[0].actual, "\"sg-0abc\"");
    }

    #[test]
    fn test_matches_is_unanchored() {
        let mut checks = Assertions::new();
        // `vpc-*` is "vpc" followed by any number of dashes
        assert!(checks.matches("pattern", "vpc-0123456789abcdef0", "vpc-*"));
        assert!(checks.matches("pattern", "my-vpc", "vpc-*"));
        assert!(!checks.matches("pattern", "subnet-1", "vpc-*"));
    }

    #[test]
    fn test_invalid_pattern_is_failure() {
        let mut checks = Assertions::new();
        assert!(!checks.matches("bad", "vpc-1", "vpc-("));

        let report = checks.finish();
        assert!(report.failures()[0].message.starts_with("invalid pattern"));
    }

    #[test]
    fn test_equal_keeps_literals() {
        let mut checks = Assertions::new();
        assert!(!checks.equal("cidr", "192.168.16.0/20", "10.0.0.0/16"));

        let failures = checks.finish().failures();
        let failure = &failures[0];
        assert_eq!(failure.expected, "\"192.168.16.0/20\"");
        assert_eq!(failure.actual, "\"10.0.0.0/16\"");
    }

    #[test]
    fn test_greater_and_len() {
        let mut checks = Assertions::new();
        assert!(checks.greater("count", 2usize, 0));
        assert!(!checks.greater("count", 0usize, 0));
        assert!(checks.len_eq("one", &["a"], 1));
        assert!(!checks.len_eq("one", &["a", "b"], 1));
        assert_eq!(checks.failed_count(), 2);
    }

    #[test]
    fn test_failures_accumulate() {
        let mut checks = Assertions::new();
        checks.fail("first", "boom", "x", "y");
        checks.contains("second", "abc", "z");
        checks.equal("third", 1, 1);

        let report = checks.finish();
        assert!(!report.passed);
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.failed_count(), 2);
    }
}
