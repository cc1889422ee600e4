//! Terraform invocation options.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{IacError, IacResult};

/// Transient Terraform failures worth retrying, keyed by regex.
pub fn default_retryable_errors() -> BTreeMap<String, String> {
    const PLUGIN: &str = "Failed to retrieve plugin due to transient network error.";
    [
        (".*read: connection reset by peer.*", "Failed to reach helm charts repository."),
        (".*transport is closing.*", "Failed to reach Kubernetes API."),
        (".*unable to verify signature.*", PLUGIN),
        (".*unable to verify checksum.*", PLUGIN),
        (".*no provider exists with the given name.*", PLUGIN),
        (".*registry service is unreachable.*", PLUGIN),
        (".*Error installing provider.*", PLUGIN),
        (".*Failed to query available provider packages.*", PLUGIN),
        (".*timeout while waiting for plugin to start.*", PLUGIN),
        (".*timed out waiting for server handshake.*", PLUGIN),
        ("could not query provider registry for", PLUGIN),
        (
            ".*Client.Timeout exceeded while awaiting headers.*",
            "Client timeout exceeded while awaiting headers",
        ),
        (
            "(?s).*Could not download module.*The requested URL returned error: 429.*",
            "Failed to download module due to rate limit (HTTP 429)",
        ),
        (".*net/http: TLS handshake timeout.*", "TLS handshake timeout"),
    ]
    .into_iter()
    .map(|(pattern, description)| (pattern.to_string(), description.to_string()))
    .collect()
}

fn default_binary() -> String {
    "terraform".to_string()
}

fn default_true() -> bool {
    true
}

/// Options for driving one Terraform configuration directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformOptions {
    /// Directory containing the Terraform configuration
    pub terraform_dir: PathBuf,
    /// Binary to execute (`terraform`, `tofu`)
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Input variables passed with `-var`
    #[serde(default)]
    pub vars: BTreeMap<String, serde_json::Value>,
    /// Variable files passed with `-var-file`
    #[serde(default)]
    pub var_files: Vec<PathBuf>,
    /// Environment variables set on every command
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    /// Pass `-no-color`
    #[serde(default = "default_true")]
    pub no_color: bool,
    /// Regex → description of errors that trigger a retry
    #[serde(default)]
    pub retryable_errors: BTreeMap<String, String>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_interval_secs: u64,
}

impl TerraformOptions {
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            binary: default_binary(),
            vars: BTreeMap::new(),
            var_files: Vec::new(),
            env_vars: BTreeMap::new(),
            no_color: true,
            retryable_errors: BTreeMap::new(),
            max_retries: 0,
            retry_interval_secs: 0,
        }
    }

    /// Retry known transient errors 3 times, 5 seconds apart.
    ///
    /// Existing retryable patterns and retry settings are kept.
    pub fn with_default_retryable_errors(mut self) -> Self {
        for (pattern, description) in default_retryable_errors() {
            self.retryable_errors.entry(pattern).or_insert(description);
        }
        if self.max_retries == 0 {
            self.max_retries = 3;
        }
        if self.retry_interval_secs == 0 {
            self.retry_interval_secs = 5;
        }
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.var_files.push(path.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_retries(mut self, max_retries: u32, interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval_secs = interval.as_secs();
        self
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// `-var` and `-var-file` arguments.
    ///
    /// String values are passed raw; other values in JSON form, which
    /// Terraform parses as HCL.
    pub fn var_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in &self.vars {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            args.push("-var".to_string());
            args.push(format!("{}={}", key, rendered));
        }
        for file in &self.var_files {
            args.push("-var-file".to_string());
            args.push(file.to_string_lossy().into_owned());
        }
        args
    }

    /// Check the directory exists and holds at least one `*.tf` file.
    pub fn validate_dir(&self) -> IacResult<Vec<PathBuf>> {
        validate_config_dir(&self.terraform_dir)
    }
}

/// Top-level `*.tf` files in `dir`.
pub fn validate_config_dir(dir: &Path) -> IacResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IacError::InvalidConfigDir(format!(
            "{} does not exist",
            dir.display()
        )));
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "tf"))
        .collect();

    if files.is_empty() {
        return Err(IacError::InvalidConfigDir(format!(
            "no .tf files in {}",
            dir.display()
        )));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_retryable_errors() {
        let options = TerraformOptions::new("./unit-test").with_default_retryable_errors();

        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_interval(), Duration::from_secs(5));
        assert!(options
            .retryable_errors
            .contains_key(".*net/http: TLS handshake timeout.*"));
    }

    #[test]
    fn test_default_retryable_errors_keeps_overrides() {
        let options = TerraformOptions::new(".")
            .with_retries(1, Duration::from_secs(0))
            .with_default_retryable_errors();

        assert_eq!(options.max_retries, 1);
        assert_eq!(options.retry_interval_secs, 5);
    }

    #[test]
    fn test_default_patterns_compile() {
        for pattern in default_retryable_errors().keys() {
            assert!(regex::Regex::new(pattern).is_ok(), "{}", pattern);
        }
    }

    #[test]
    fn test_var_args() {
        let options = TerraformOptions::new(".")
            .with_var("name", "member")
            .with_var("azs", json!(["eu-west-1a", "eu-west-1b"]))
            .with_var_file("prod.tfvars");

        assert_eq!(
            options.var_args(),
            vec![
                "-var",
                "azs=[\"eu-west-1a\",\"eu-west-1b\"]",
                "-var",
                "name=member",
                "-var-file",
                "prod.tfvars",
            ]
        );
    }

    #[test]
    fn test_validate_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_config_dir(dir.path()),
            Err(IacError::InvalidConfigDir(_))
        ));

        std::fs::write(dir.path().join("main.tf"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let files = validate_config_dir(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("main.tf")]);
    }

    #[test]
    fn test_validate_missing_dir() {
        let options = TerraformOptions::new("/no/such/terraform/dir");
        assert!(options.validate_dir().is_err());
    }

    #[test]
    fn test_options_from_json_defaults() {
        let options: TerraformOptions =
            serde_json::from_value(json!({ "terraform_dir": "./unit-test" })).unwrap();

        assert_eq!(options.binary, "terraform");
        assert!(options.no_color);
        assert_eq!(options.max_retries, 0);
    }
}
