//! # probe_assert
//!
//! Non-fatal assertions over values read from provisioned infrastructure.
//!
//! Every check is recorded, pass or fail, so a scenario can keep verifying
//! after the first mismatch and still tear its environment down. Failures
//! carry the literal and expected values.
//!
//! ## Example
//!
//! ```rust
//! use probe_assert::Assertions;
//!
//! let mut checks = Assertions::new();
//! checks.contains("vpc_id contains vpc-", "vpc-0123456789abcdef0", "vpc-");
//! checks.equal("Should have 1 secondary CIDR block", 1, 1);
//!
//! let report = checks.finish();
//! assert!(report.passed);
//! ```

pub mod assertions;
pub mod report;

pub use assertions::Assertions;
pub use report::{AssertionFailure, AssertionReport, CheckOutcome, CheckStatus};
