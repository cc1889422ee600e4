//! Error types for IaC module.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur during IaC operations.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Terraform init failed: {0}")]
    InitFailed(String),

    #[error("Terraform apply failed: {0}")]
    ApplyFailed(String),

    #[error("Terraform destroy failed: {0}")]
    DestroyFailed(String),

    #[error("Terraform output '{name}' failed: {message}")]
    OutputFailed { name: String, message: String },

    #[error("Output '{name}' is not valid JSON: {message}")]
    OutputParse { name: String, message: String },

    #[error("Output '{name}' is not a list: {value}")]
    OutputNotList { name: String, value: String },

    #[error("Output '{name}' is not a map: {value}")]
    OutputNotMap { name: String, value: String },

    #[error("Invalid Terraform directory: {0}")]
    InvalidConfigDir(String),

    #[error("Invalid retryable error pattern: {0}")]
    InvalidRetryPattern(#[from] regex::Error),

    #[error("Runner error: {0}")]
    Runner(#[from] probe_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
