//! Suite configuration loaded from `infraprobe.yaml`.
//!
//! ```yaml
//! parallelism: 2
//! terraform:
//!   binary: terraform
//!   max_retries: 3
//!   retry_interval_secs: 5
//!   command_timeout_secs: 1800
//!   execution:
//!     mode: container
//!     image: hashicorp/terraform
//!     tag: "1.6"
//! scenarios:
//!   member-vpc:
//!     dir: ./unit-test
//!     vars:
//!       region: eu-west-1
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use probe_iac::TerraformOptions;
use probe_runner::{ExecutionMode, RunConfig};

use crate::error::{CoreError, CoreResult};
use crate::scenario::Scenario;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "infraprobe.yaml";

fn default_parallelism() -> usize {
    1
}

fn default_binary() -> String {
    "terraform".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    1800
}

/// How Terraform is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerraformSettings {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default)]
    pub execution: ExecutionMode,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub stream_logs: bool,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            execution: ExecutionMode::default(),
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval(),
            command_timeout_secs: default_timeout(),
            stream_logs: false,
        }
    }
}

impl TerraformSettings {
    pub fn run_config(&self) -> RunConfig {
        RunConfig::default()
            .timeout(self.command_timeout_secs)
            .stream_logs(self.stream_logs)
    }
}

/// Per-scenario overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioOverrides {
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub vars: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub var_files: Vec<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Complete suite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub terraform: TerraformSettings,
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioOverrides>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            terraform: TerraformSettings::default(),
            scenarios: BTreeMap::new(),
        }
    }
}

impl ProbeConfig {
    /// Read and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        debug!("Reading configuration from {:?}", path);

        let content = fs::read_to_string(path)?;
        let config: ProbeConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `./infraprobe.yaml` if present, else defaults.
    pub fn discover(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).is_file() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.parallelism == 0 {
            return Err(CoreError::InvalidConfig(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.terraform.binary.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "terraform.binary must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuration directory for `scenario`, honouring overrides.
    pub fn dir_for(&self, scenario: &dyn Scenario) -> PathBuf {
        self.scenarios
            .get(scenario.name())
            .and_then(|o| o.dir.clone())
            .unwrap_or_else(|| scenario.default_dir().to_path_buf())
    }

    /// Terraform options for `scenario`: the scenario's own options, then
    /// suite-wide settings, then per-scenario overrides.
    pub fn options_for(&self, scenario: &dyn Scenario, dir: Option<&Path>) -> TerraformOptions {
        let dir = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.dir_for(scenario));

        let mut options = scenario.options(&dir);
        options.binary = self.terraform.binary.clone();
        options.max_retries = self.terraform.max_retries;
        options.retry_interval_secs = self.terraform.retry_interval_secs;

        if let Some(overrides) = self.scenarios.get(scenario.name()) {
            options
                .vars
                .extend(overrides.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            options.var_files.extend(overrides.var_files.iter().cloned());
            options
                .env_vars
                .extend(overrides.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        options
    }
}
