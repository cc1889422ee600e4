//! Run command - Provision, verify and tear down scenarios.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use probe_core::{
    ExecutorOptions, ProbeConfig, ScenarioExecutor, ScenarioRegistry, ScenarioReport,
    ScenarioSuite, StageStatus, SuiteReport,
};
use probe_iac::TerraformRunner;
use probe_runner::{ContainerImage, ExecutionMode, ProcessRunner, ProcessRunnerOptions};

use crate::ExitCodes;

#[derive(Args)]
pub struct RunArgs {
    /// Scenarios to run (defaults to all)
    pub scenarios: Vec<String>,

    /// Terraform configuration directory (single scenario only)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Configuration file (defaults to ./infraprobe.yaml when present)
    #[arg(short, long, env = "INFRAPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of scenarios running at once
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Terraform variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Run Terraform inside the hashicorp/terraform container
    #[arg(long)]
    pub container: bool,

    /// Terraform binary (e.g. tofu)
    #[arg(long, env = "INFRAPROBE_TERRAFORM_BIN")]
    pub terraform_bin: Option<String>,

    /// Print commands without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid KEY=VALUE argument: {:?}", s)),
    }
}

/// Suite configuration with command-line overrides applied.
fn resolve_config(args: &RunArgs) -> Result<ProbeConfig> {
    let mut config =
        ProbeConfig::discover(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(parallel) = args.parallel {
        config.parallelism = parallel;
    }
    if let Some(binary) = &args.terraform_bin {
        config.terraform.binary = binary.clone();
    }
    if args.container && config.terraform.execution == ExecutionMode::Local {
        config.terraform.execution = ExecutionMode::Container(ContainerImage::terraform());
    }

    config.validate()?;
    Ok(config)
}

pub async fn execute(args: RunArgs) -> Result<u8> {
    let config = resolve_config(&args)?;

    let registry = ScenarioRegistry::with_builtins();
    let scenarios = registry.select(&args.scenarios)?;
    if args.dir.is_some() && scenarios.len() > 1 {
        anyhow::bail!("--dir argument requires exactly one scenario");
    }

    let mut runner_options = ProcessRunnerOptions::new().mode(config.terraform.execution.clone());
    if args.dry_run {
        runner_options = runner_options.dry_run();
    }
    let runner = ProcessRunner::new(runner_options).context("Failed to set up command runner")?;
    let provisioner =
        TerraformRunner::new(Arc::new(runner)).with_run_config(config.terraform.run_config());

    let executor = ScenarioExecutor::new(Arc::new(provisioner)).with_options(ExecutorOptions {
        skip_verify: args.dry_run,
    });

    let mut suite = ScenarioSuite::new(Arc::new(executor), config.parallelism);
    for scenario in scenarios {
        let mut options = config.options_for(scenario.as_ref(), args.dir.as_deref());
        options.vars.extend(
            args.vars
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone()))),
        );
        suite.add(scenario, options);
    }

    info!("Running {} scenario(s)", suite.len());
    let report = suite.run().await;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    Ok(ExitCodes::for_failure(report.failure_kind()))
}

fn print_report(report: &SuiteReport) {
    for scenario in &report.scenarios {
        print_scenario(scenario);
        println!();
    }

    let total = report.scenarios.len();
    if report.passed() {
        println!("✅ {}/{} scenario(s) passed", total, total);
    } else {
        println!(
            "❌ {}/{} scenario(s) failed",
            report.failed_count(),
            total
        );
    }
}

fn print_scenario(report: &ScenarioReport) {
    println!(
        "🏗️  {} ({}) in {}ms",
        report.scenario, report.terraform_dir, report.duration_ms
    );

    for stage in &report.stages {
        let icon = match stage.status {
            StageStatus::Succeeded => "✅",
            StageStatus::Failed => "❌",
            StageStatus::Skipped => "⏭️ ",
        };
        match &stage.message {
            Some(message) => println!("   {} {}: {}", icon, stage.stage, message),
            None => println!("   {} {}", icon, stage.stage),
        }
    }

    for failure in report.failures() {
        println!("      - {}", failure);
    }

    if !report.assertions.checks.is_empty() {
        println!("   {}", report.assertions.summary());
    }
}
