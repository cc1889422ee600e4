//! List command - Show registered scenarios.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use probe_core::{ProbeConfig, ScenarioRegistry};

use crate::ExitCodes;

#[derive(Args)]
pub struct ListArgs {
    /// Configuration file (defaults to ./infraprobe.yaml when present)
    #[arg(short, long, env = "INFRAPROBE_CONFIG")]
    pub config: Option<PathBuf>,
}

pub fn execute(args: ListArgs) -> Result<u8> {
    let config =
        ProbeConfig::discover(args.config.as_deref()).context("Failed to load configuration")?;
    let registry = ScenarioRegistry::with_builtins();

    println!("📋 Registered scenarios:");
    for scenario in registry.all() {
        println!(
            "   {:<16} {}  ({})",
            scenario.name(),
            scenario.description(),
            config.dir_for(scenario.as_ref()).display()
        );
    }

    Ok(ExitCodes::SUCCESS)
}
