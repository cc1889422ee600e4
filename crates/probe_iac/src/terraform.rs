//! Terraform runner.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use probe_runner::{CommandRunner, CommandSpec, ExecutionResult, RunConfig};

use crate::error::{IacError, IacResult};
use crate::options::TerraformOptions;
use crate::provisioner::Provisioner;

/// Terraform subcommands driven by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerraformCommand {
    Init,
    Apply,
    Destroy,
    Output,
}

impl TerraformCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerraformCommand::Init => "init",
            TerraformCommand::Apply => "apply",
            TerraformCommand::Destroy => "destroy",
            TerraformCommand::Output => "output",
        }
    }

    /// Full argument list for this subcommand.
    pub fn args(&self, options: &TerraformOptions) -> Vec<String> {
        let mut args: Vec<String> = match self {
            TerraformCommand::Init => vec!["init", "-upgrade=false", "-input=false"],
            TerraformCommand::Apply => vec!["apply", "-input=false", "-auto-approve"],
            TerraformCommand::Destroy => vec!["destroy", "-auto-approve", "-input=false"],
            TerraformCommand::Output => vec!["output", "-json"],
        }
        .into_iter()
        .map(String::from)
        .collect();

        if matches!(self, TerraformCommand::Apply | TerraformCommand::Destroy) {
            args.extend(options.var_args());
        }
        if options.no_color || *self == TerraformCommand::Output {
            args.push("-no-color".to_string());
        }
        args
    }
}

impl std::fmt::Display for TerraformCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terraform runner that executes commands through a [`CommandRunner`].
pub struct TerraformRunner {
    runner: Arc<dyn CommandRunner>,
    run_config: RunConfig,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            run_config: RunConfig::default(),
        }
    }

    /// Set timeout and log streaming for every Terraform command.
    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    /// Run terraform init.
    pub async fn init(&self, options: &TerraformOptions) -> IacResult<String> {
        info!("Running terraform init in {:?}", options.terraform_dir);
        let result = self
            .run_with_retries(options, TerraformCommand::Init.args(options), IacError::InitFailed)
            .await?;
        Ok(result.combined_output())
    }

    /// Run terraform apply.
    pub async fn apply(&self, options: &TerraformOptions) -> IacResult<String> {
        info!("Running terraform apply in {:?}", options.terraform_dir);
        let result = self
            .run_with_retries(options, TerraformCommand::Apply.args(options), IacError::ApplyFailed)
            .await?;
        Ok(result.combined_output())
    }

    /// Read an output as raw JSON.
    pub async fn output_json(&self, options: &TerraformOptions, name: &str) -> IacResult<Value> {
        debug!("Reading terraform output {}", name);
        let mut args = TerraformCommand::Output.args(options);
        args.push(name.to_string());

        let result = self
            .run_with_retries(options, args, |message| IacError::OutputFailed {
                name: name.to_string(),
                message,
            })
            .await?;

        parse_output(name, &result.stdout)
    }

    /// Run a Terraform command, retrying when the output matches a
    /// retryable error pattern.
    async fn run_with_retries<F>(
        &self,
        options: &TerraformOptions,
        args: Vec<String>,
        fail: F,
    ) -> IacResult<ExecutionResult>
    where
        F: Fn(String) -> IacError + Send + Sync,
    {
        let retryable = options
            .retryable_errors
            .iter()
            .map(|(pattern, description)| {
                Regex::new(pattern)
                    .map(|re| (re, description.as_str()))
                    .map_err(IacError::from)
            })
            .collect::<IacResult<Vec<_>>>()?;

        let subcommand = args.first().cloned().unwrap_or_default();
        let spec = CommandSpec::new(options.binary.clone())
            .workdir(options.terraform_dir.clone())
            .envs(&options.env_vars)
            .args(args);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = self.runner.run(&spec, &self.run_config).await?;
            if result.success() {
                return Ok(result);
            }

            let output = result.combined_output();
            let matched = retryable
                .iter()
                .find(|(re, _)| re.is_match(&output))
                .map(|(_, description)| *description);

            match matched {
                Some(description) if attempt <= options.max_retries => {
                    warn!(
                        "terraform {} hit retryable error ({}), retry {}/{} in {}s",
                        subcommand,
                        description,
                        attempt,
                        options.max_retries,
                        options.retry_interval_secs
                    );
                    tokio::time::sleep(options.retry_interval()).await;
                }
                Some(description) => {
                    return Err(fail(format!(
                        "gave up after {} attempts ({}): {}",
                        attempt,
                        description,
                        output.trim()
                    )));
                }
                None => return Err(fail(output.trim().to_string())),
            }
        }
    }
}

/// Parse `terraform output -json <name>` stdout.
pub fn parse_output(name: &str, stdout: &str) -> IacResult<Value> {
    serde_json::from_str(stdout.trim()).map_err(|e| IacError::OutputParse {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Strings unquoted, everything else in compact JSON form.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Provisioner for TerraformRunner {
    async fn init_and_apply(&self, options: &TerraformOptions) -> IacResult<String> {
        self.init(options).await?;
        self.apply(options).await
    }

    async fn destroy(&self, options: &TerraformOptions) -> IacResult<String> {
        info!("Running terraform destroy in {:?}", options.terraform_dir);
        let result = self
            .run_with_retries(
                options,
                TerraformCommand::Destroy.args(options),
                IacError::DestroyFailed,
            )
            .await?;
        Ok(result.combined_output())
    }

    async fn output(&self, options: &TerraformOptions, name: &str) -> IacResult<String> {
        let value = self.output_json(options, name).await?;
        Ok(render_value(&value))
    }

    async fn output_list(&self, options: &TerraformOptions, name: &str) -> IacResult<Vec<String>> {
        match self.output_json(options, name).await? {
            Value::Array(items) => Ok(items.iter().map(render_value).collect()),
            other => Err(IacError::OutputNotList {
                name: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    async fn output_map(
        &self,
        options: &TerraformOptions,
        name: &str,
    ) -> IacResult<BTreeMap<String, String>> {
        match self.output_json(options, name).await? {
            Value::Object(entries) => Ok(entries
                .iter()
                .map(|(k, v)| (k.clone(), render_value(v)))
                .collect()),
            other => Err(IacError::OutputNotMap {
                name: name.to_string(),
                value: other.to_string(),
            }),
        }
    }
}
