//! Member VPC scenario tests.
//!
//! Terraform is replaced by the mock runner, so these tests exercise the full
//! driver stack (argument building, JSON output parsing, retries) without
//! touching a cloud account.

use std::sync::Arc;
use std::time::Duration;

use probe_core::{
    FailureKind, MemberVpcScenario, Scenario, ScenarioExecutor, ScenarioStatus, Stage,
    StageStatus,
};
use probe_iac::TerraformRunner;
use probe_runner::{MockResponse, MockRunner};

const VPC_ID: &str = "\"vpc-0123456789abcdef0\"";
const CIDR_BLOCKS: &str = "[\"192.168.16.0/20\"]";
const SUBNET_IDS: &str = "[\"subnet-aaaa1111aaaa1111a\",\"subnet-bbbb2222bbbb2222b\"]";

fn healthy() -> MockRunner {
    MockRunner::new()
        .on(["vpc_id"], MockResponse::success(VPC_ID))
        .on(["secondary_cidr_blocks"], MockResponse::success(CIDR_BLOCKS))
        .on(["secondary_cidr_subnet_ids"], MockResponse::success(SUBNET_IDS))
}

async fn run(mock: &MockRunner) -> probe_core::ScenarioReport {
    let executor =
        ScenarioExecutor::new(Arc::new(TerraformRunner::new(Arc::new(mock.clone()))));
    let scenario: Arc<dyn Scenario> = Arc::new(MemberVpcScenario::new());
    let options = scenario
        .options(scenario.default_dir())
        .with_retries(3, Duration::ZERO);
    executor.run(scenario, options).await
}

#[tokio::test]
async fn test_member_vpc_passes() {
    let mock = healthy();

    let report = run(&mock).await;

    assert!(report.passed(), "{:?}", report.failures());
    assert_eq!(report.terraform_dir, "./unit-test");
    assert_eq!(report.failure_kind(), None);
    // contains + pattern, count + value, count + one per subnet
    assert_eq!(report.assertions.checks.len(), 7);
    assert_eq!(
        mock.subcommands(),
        vec!["init", "apply", "output", "output", "output", "destroy"]
    );
}

#[tokio::test]
async fn test_wrong_cidr_is_reported_with_literals() {
    let mock = MockRunner::new()
        .on(["vpc_id"], MockResponse::success(VPC_ID))
        .on(
            ["secondary_cidr_blocks"],
            MockResponse::success("[\"10.1.0.0/16\",\"192.168.16.0/20\"]"),
        )
        .on(["secondary_cidr_subnet_ids"], MockResponse::success(SUBNET_IDS));

    let report = run(&mock).await;

    assert_eq!(report.status, ScenarioStatus::Failed);
    assert_eq!(report.failure_kind(), Some(FailureKind::Assertion));

    let failures = report.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].check, "Should have 1 secondary CIDR block");
    assert_eq!(failures[1].check, "Secondary CIDR should be 192.168.16.0/20");
    assert_eq!(failures[1].expected, "\"192.168.16.0/20\"");
    assert_eq!(failures[1].actual, "\"10.1.0.0/16\"");

    // Verification failures never skip teardown
    assert_eq!(mock.calls_to("destroy").len(), 1);
    assert_eq!(
        report.stage(Stage::Teardown).unwrap().status,
        StageStatus::Succeeded
    );
}

#[tokio::test]
async fn test_empty_outputs_fail_without_panicking() {
    let mock = MockRunner::new()
        .on(["vpc_id"], MockResponse::success("\"igw-123\""))
        .on(["secondary_cidr_blocks"], MockResponse::success("[]"))
        .on(["secondary_cidr_subnet_ids"], MockResponse::success("[]"));

    let report = run(&mock).await;

    let checks: Vec<_> = report.failures().into_iter().map(|f| f.check).collect();
    assert_eq!(
        checks,
        vec![
            "vpc_id contains vpc-",
            "vpc_id matches vpc-*",
            "Should have 1 secondary CIDR block",
            "Secondary CIDR should be 192.168.16.0/20",
            "Should have at least one secondary CIDR subnet",
        ]
    );
    assert_eq!(mock.calls_to("destroy").len(), 1);
}

#[tokio::test]
async fn test_bad_subnet_id_is_reported() {
    let mock = MockRunner::new()
        .on(["vpc_id"], MockResponse::success(VPC_ID))
        .on(["secondary_cidr_blocks"], MockResponse::success(CIDR_BLOCKS))
        .on(
            ["secondary_cidr_subnet_ids"],
            MockResponse::success("[\"subnet-1\",\"eni-2\"]"),
        );

    let report = run(&mock).await;

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].check, "eni-2 contains subnet-");
}

#[tokio::test]
async fn test_provision_failure_is_fatal_but_torn_down() {
    let mock = healthy().on(
        ["apply"],
        MockResponse::failure(1, "Error: creating EC2 VPC: VpcLimitExceeded"),
    );

    let report = run(&mock).await;

    assert_eq!(report.failure_kind(), Some(FailureKind::Provision));
    let provision = report.stage(Stage::Provision).unwrap();
    assert!(provision.message.as_deref().unwrap().contains("VpcLimitExceeded"));
    assert_eq!(
        report.stage(Stage::Verify).unwrap().status,
        StageStatus::Skipped
    );
    assert!(!mock.was_called("output"));
    assert_eq!(mock.calls_to("destroy").len(), 1);
}

#[tokio::test]
async fn test_missing_output_stops_verification() {
    let mock = MockRunner::new()
        .on(["vpc_id"], MockResponse::success(VPC_ID))
        .on(
            ["secondary_cidr_blocks"],
            MockResponse::failure(1, "Error: Output \"secondary_cidr_blocks\" not found"),
        );

    let report = run(&mock).await;

    let verify = report.stage(Stage::Verify).unwrap();
    assert_eq!(verify.status, StageStatus::Failed);
    assert!(verify.message.as_deref().unwrap().contains("secondary_cidr_blocks"));
    assert!(mock
        .calls_to("output")
        .iter()
        .all(|c| !c.args.contains(&"secondary_cidr_subnet_ids".to_string())));
    assert_eq!(mock.calls_to("destroy").len(), 1);
}

#[tokio::test]
async fn test_teardown_failure_is_secondary() {
    let mock = healthy().on(
        ["destroy"],
        MockResponse::failure(1, "Error: DependencyViolation"),
    );

    let report = run(&mock).await;

    assert!(!report.passed());
    assert_eq!(report.failure_kind(), Some(FailureKind::Teardown));
    assert!(report.assertions.passed);
}

#[tokio::test]
async fn test_transient_apply_error_is_retried() {
    let mock = healthy().on_sequence(
        ["apply"],
        vec![
            MockResponse::failure(1, "Error: timeout while waiting for plugin to start"),
            MockResponse::success("Apply complete!"),
        ],
    );

    let report = run(&mock).await;

    assert!(report.passed());
    assert_eq!(mock.calls_to("apply").len(), 2);
}
