//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod check;
pub mod list;
pub mod run;

/// infraprobe - provision, verify and tear down Terraform configurations
#[derive(Parser)]
#[command(name = "infraprobe")]
#[command(version, about = "infraprobe - integration tests for Terraform configurations")]
#[command(long_about = r#"
infraprobe applies a Terraform configuration, checks its outputs and destroys
it again. Teardown runs on every path, including failed applies.

COMMANDS:
  run    → Provision, verify and tear down scenarios
  list   → List registered scenarios
  check  → Check scenario directories without provisioning

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Assertion failure
  5 - Provisioning failure
  6 - Teardown failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios (all registered scenarios when none are named)
    Run(run::RunArgs),

    /// List registered scenarios
    List(list::ListArgs),

    /// Check scenario configuration directories
    Check(check::CheckArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "infraprobe",
            "-v",
            "run",
            "member-vpc",
            "--parallel",
            "2",
            "--var",
            "region=eu-west-1",
            "--dry-run",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.scenarios, vec!["member-vpc"]);
                assert_eq!(args.parallel, Some(2));
                assert_eq!(args.vars, vec![("region".to_string(), "eu-west-1".to_string())]);
                assert!(args.dry_run);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_bad_var_rejected() {
        assert!(Cli::try_parse_from(["infraprobe", "run", "--var", "novalue"]).is_err());
    }
}
