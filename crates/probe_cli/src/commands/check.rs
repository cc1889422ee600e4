//! Check command - Verify scenario directories without provisioning.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use probe_core::{ProbeConfig, ScenarioRegistry};
use probe_iac::validate_config_dir;

use crate::ExitCodes;

#[derive(Args)]
pub struct CheckArgs {
    /// Scenarios to check (defaults to all)
    pub scenarios: Vec<String>,

    /// Terraform configuration directory (single scenario only)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Configuration file (defaults to ./infraprobe.yaml when present)
    #[arg(short, long, env = "INFRAPROBE_CONFIG")]
    pub config: Option<PathBuf>,
}

pub fn execute(args: CheckArgs) -> Result<u8> {
    let config =
        ProbeConfig::discover(args.config.as_deref()).context("Failed to load configuration")?;
    let registry = ScenarioRegistry::with_builtins();
    let scenarios = registry.select(&args.scenarios)?;
    if args.dir.is_some() && scenarios.len() > 1 {
        anyhow::bail!("--dir argument requires exactly one scenario");
    }

    let mut all_passed = true;
    for scenario in scenarios {
        let dir = args
            .dir
            .clone()
            .unwrap_or_else(|| config.dir_for(scenario.as_ref()));
        info!("Checking {} in {:?}", scenario.name(), dir);

        match validate_config_dir(&dir) {
            Ok(files) => println!(
                "   ✅ {}: {} Terraform file(s) in {}",
                scenario.name(),
                files.len(),
                dir.display()
            ),
            Err(e) => {
                all_passed = false;
                println!("   ❌ {}: {}", scenario.name(), e);
            }
        }
    }

    if all_passed {
        Ok(ExitCodes::SUCCESS)
    } else {
        Ok(ExitCodes::INVALID_ARGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: PathBuf) -> CheckArgs {
        CheckArgs {
            scenarios: vec!["member-vpc".to_string()],
            dir: Some(dir),
            config: None,
        }
    }

    #[test]
    fn test_check_valid_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "resource \"null_resource\" \"x\" {}").unwrap();

        assert_eq!(execute(args(dir.path().to_path_buf())).unwrap(), ExitCodes::SUCCESS);
    }

    #[test]
    fn test_check_empty_dir() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(
            execute(args(dir.path().to_path_buf())).unwrap(),
            ExitCodes::INVALID_ARGS
        );
    }

    #[test]
    fn test_check_unknown_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path().to_path_buf());
        args.scenarios = vec!["nope".to_string()];

        assert!(execute(args).is_err());
    }
}
