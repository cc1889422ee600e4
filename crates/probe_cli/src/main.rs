//! infraprobe CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Assertion failure
//! - 5: Provisioning failure
//! - 6: Teardown failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

use probe_core::{CoreError, FailureKind};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const ASSERTION_FAILURE: u8 = 3;
    pub const PROVISION_ERROR: u8 = 5;
    pub const TEARDOWN_ERROR: u8 = 6;

    /// Exit code for the most severe failure of a run.
    pub fn for_failure(kind: Option<FailureKind>) -> u8 {
        match kind {
            None => Self::SUCCESS,
            Some(FailureKind::Provision) => Self::PROVISION_ERROR,
            Some(FailureKind::Assertion) => Self::ASSERTION_FAILURE,
            Some(FailureKind::Teardown) => Self::TEARDOWN_ERROR,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::List(args) => commands::list::execute(args),
        Commands::Check(args) => commands::check::execute(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    for crate_name in ["probe_cli", "probe_core", "probe_iac", "probe_runner", "probe_assert"] {
        if let Ok(directive) = format!("{}={}", crate_name, level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    // Logging may already be initialized
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(core) = e.downcast_ref::<CoreError>() {
        return match core {
            CoreError::ScenarioNotFound(_) | CoreError::InvalidConfig(_) | CoreError::Yaml(_) => {
                ExitCodes::INVALID_ARGS
            }
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_failure() {
        assert_eq!(ExitCodes::for_failure(None), 0);
        assert_eq!(ExitCodes::for_failure(Some(FailureKind::Provision)), 5);
        assert_eq!(ExitCodes::for_failure(Some(FailureKind::Assertion)), 3);
        assert_eq!(ExitCodes::for_failure(Some(FailureKind::Teardown)), 6);
    }

    #[test]
    fn test_categorize_error() {
        let not_found = anyhow::Error::new(CoreError::ScenarioNotFound("x".to_string()));
        assert_eq!(categorize_error(&not_found), ExitCodes::INVALID_ARGS);

        // Provisioning failures arrive through the report, not as errors
        let iac = anyhow::Error::new(CoreError::Iac(probe_iac::IacError::InvalidConfigDir(
            "./missing".to_string(),
        )));
        assert_eq!(categorize_error(&iac), ExitCodes::GENERAL_ERROR);

        let other = anyhow::anyhow!("disk full");
        assert_eq!(categorize_error(&other), ExitCodes::GENERAL_ERROR);
    }
}
