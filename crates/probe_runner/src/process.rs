//! Process-based command runner.
//!
//! Commands run either directly on the host or wrapped in `docker run` /
//! `podman run`, with automatic runtime detection in container mode.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::{CommandSpec, ContainerImage, ContainerRuntime, ExecutionMode, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Log output from command execution.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Log handler callback type.
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;

/// Process runner options.
#[derive(Debug, Clone)]
pub struct ProcessRunnerOptions {
    /// Local process or container
    pub mode: ExecutionMode,
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
    /// CI mode (timestamped streaming output)
    pub ci_mode: bool,
}

impl Default for ProcessRunnerOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Local,
            dry_run: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl ProcessRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn ci_mode(mut self) -> Self {
        self.ci_mode = true;
        self
    }

    pub fn container(mut self, image: ContainerImage) -> Self {
        self.mode = ExecutionMode::Container(image);
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Command line ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PreparedCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    /// Runtime and container name when wrapped in `run --name`
    container: Option<(ContainerRuntime, String)>,
}

impl PreparedCommand {
    fn display(&self) -> String {
        CommandSpec::new(&self.program).args(self.args.clone()).display()
    }
}

/// Process-based command runner.
pub struct ProcessRunner {
    options: ProcessRunnerOptions,
    runtime: Option<ContainerRuntime>,
    log_handler: Option<LogHandler>,
}

impl ProcessRunner {
    /// Create a new runner, detecting the container runtime when needed.
    pub fn new(options: ProcessRunnerOptions) -> RunnerResult<Self> {
        let runtime = match &options.mode {
            ExecutionMode::Local => None,
            ExecutionMode::Container(image) => {
                let runtime = Self::detect_runtime(image.runtime)?;
                info!("Using container runtime: {}", runtime);
                Some(runtime)
            }
        };

        Ok(Self {
            options,
            runtime,
            log_handler: None,
        })
    }

    /// Create a runner with a specific container runtime, skipping detection.
    pub fn with_runtime(runtime: ContainerRuntime, options: ProcessRunnerOptions) -> Self {
        Self {
            options,
            runtime: Some(runtime),
            log_handler: None,
        }
    }

    /// Set a log handler for streaming logs.
    pub fn with_log_handler(mut self, handler: LogHandler) -> Self {
        self.log_handler = Some(handler);
        self
    }

    /// Detect available container runtime.
    pub fn detect_runtime(preferred: Option<ContainerRuntime>) -> RunnerResult<ContainerRuntime> {
        if let Some(preferred) = preferred {
            if Self::is_runtime_available(preferred) {
                return Ok(preferred);
            }
            warn!(
                "Preferred runtime {} not available, trying alternatives",
                preferred
            );
        }

        for runtime in [ContainerRuntime::Docker, ContainerRuntime::Podman] {
            if Self::is_runtime_available(runtime) {
                return Ok(runtime);
            }
        }

        Err(RunnerError::RuntimeNotAvailable(
            "Neither Docker nor Podman is available".to_string(),
        ))
    }

    fn is_runtime_available(runtime: ContainerRuntime) -> bool {
        Command::new(runtime.command())
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn prepare(&self, spec: &CommandSpec) -> RunnerResult<PreparedCommand> {
        match &self.options.mode {
            ExecutionMode::Local => {
                if let Some(dir) = &spec.workdir {
                    if !dir.is_dir() && !self.options.dry_run {
                        return Err(RunnerError::InvalidWorkdir(dir.display().to_string()));
                    }
                }
                Ok(PreparedCommand {
                    program: spec.program.clone(),
                    args: spec.args.clone(),
                    cwd: spec.workdir.clone(),
                    env: spec.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    container: None,
                })
            }
            ExecutionMode::Container(image) => {
                let runtime = self.runtime.ok_or_else(|| {
                    RunnerError::RuntimeNotAvailable("no container runtime selected".to_string())
                })?;
                let host_dir = match &spec.workdir {
                    Some(dir) if self.options.dry_run => Some(dir.clone()),
                    Some(dir) => Some(std::fs::canonicalize(dir).map_err(|e| {
                        RunnerError::InvalidWorkdir(format!("{}: {}", dir.display(), e))
                    })?),
                    None => None,
                };
                let name = format!("infraprobe-{}", uuid::Uuid::new_v4());
                Ok(PreparedCommand {
                    program: runtime.command().to_string(),
                    args: build_container_args(spec, image, host_dir.as_ref(), &name),
                    cwd: None,
                    env: Vec::new(),
                    container: Some((runtime, name)),
                })
            }
        }
    }
}

/// Build `run` arguments that execute `spec` inside `image`.
fn build_container_args(
    spec: &CommandSpec,
    image: &ContainerImage,
    host_dir: Option<&PathBuf>,
    name: &str,
) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        name.to_string(),
    ];

    if let Some(dir) = host_dir {
        args.push("-w".to_string());
        args.push(ContainerImage::WORKSPACE.to_string());
        args.push("-v".to_string());
        args.push(format!(
            "{}:{}",
            dir.to_string_lossy(),
            ContainerImage::WORKSPACE
        ));
    }

    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }

    // `-e NAME` forwards the host value when set
    for name in &image.passthrough_env {
        if !spec.env.contains_key(name) {
            args.push("-e".to_string());
            args.push(name.clone());
        }
    }

    args.push("--entrypoint".to_string());
    args.push(spec.program.clone());
    args.push(image.full_image());
    args.extend(spec.args.iter().cloned());

    args
}

/// Arguments that stop the named container.
fn stop_container_args(name: &str) -> Vec<String> {
    vec!["kill".to_string(), name.to_string()]
}

fn stop_container(runtime: ContainerRuntime, name: &str) {
    let status = Command::new(runtime.command())
        .args(stop_container_args(name))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => info!("Stopped container {}", name),
        Ok(status) => warn!("Stopping container {} exited with {}", name, status),
        Err(e) => error!("Failed to stop container {}: {}", name, e),
    }
}

/// Capture `reader` and, when streaming, echo each line to `sink`.
///
/// Callers pass stderr so stdout stays reserved for reports.
fn collect_stream<R: Read, W: Write>(
    reader: R,
    mut sink: W,
    stream: LogStream,
    stream_logs: bool,
    ci_mode: bool,
    log_handler: Option<LogHandler>,
) -> String {
    let mut output = String::new();
    for line in BufReader::new(reader).lines().map_while(Result::ok) {
        output.push_str(&line);
        output.push('\n');
        if !stream_logs {
            continue;
        }
        let log_line = LogLine {
            timestamp: Utc::now(),
            stream,
            message: line,
        };
        let written = if ci_mode {
            writeln!(
                sink,
                "[{}] [{}] {}",
                log_line.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                stream,
                log_line.message
            )
        } else {
            writeln!(sink, "{}", log_line.message)
        };
        if let Err(e) = written {
            debug!("Failed to echo {} line: {}", stream, e);
        }
        if let Some(handler) = &log_handler {
            handler(log_line);
        }
    }
    output
}

/// Spawn the command, wait with timeout and capture output.
fn execute_blocking(
    prepared: PreparedCommand,
    run_config: RunConfig,
    ci_mode: bool,
    log_handler: Option<LogHandler>,
) -> RunnerResult<(i64, String, String)> {
    let mut cmd = Command::new(&prepared.program);
    cmd.args(&prepared.args);
    cmd.envs(prepared.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(cwd) = &prepared.cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Executing: {}", prepared.display());

    let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
        program: prepared.program.clone(),
        message: e.to_string(),
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stderr not captured".to_string()))?;

    let stream_logs = run_config.stream_logs;
    let stdout_handle = std::thread::spawn({
        let log_handler = log_handler.clone();
        move || {
            collect_stream(
                stdout,
                std::io::stderr(),
                LogStream::Stdout,
                stream_logs,
                ci_mode,
                log_handler,
            )
        }
    });
    let stderr_handle = std::thread::spawn(move || {
        collect_stream(
            stderr,
            std::io::stderr(),
            LogStream::Stderr,
            stream_logs,
            ci_mode,
            log_handler,
        )
    });

    let status = if run_config.timeout_seconds > 0 {
        let timeout = Duration::from_secs(run_config.timeout_seconds);
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        warn!(
                            "{} timed out after {}s, stopping it",
                            prepared.display(),
                            run_config.timeout_seconds
                        );
                        // Killing the run client leaves the container running
                        if let Some((runtime, name)) = &prepared.container {
                            stop_container(*runtime, name);
                        }
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(RunnerError::Timeout(run_config.timeout_seconds));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(RunnerError::ExecutionFailed(format!(
                        "Failed to wait for process: {}",
                        e
                    )));
                }
            }
        }
    } else {
        child.wait().map_err(|e| {
            RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e))
        })?
    };

    let stdout_output = stdout_handle.join().unwrap_or_default();
    let stderr_output = stderr_handle.join().unwrap_or_default();

    let exit_code = status.code().map(i64::from).unwrap_or(-1);

    Ok((exit_code, stdout_output, stderr_output))
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(match self.runtime {
            Some(runtime) => Self::is_runtime_available(runtime),
            None => true,
        })
    }

    fn describe(&self) -> String {
        match (&self.options.mode, self.runtime) {
            (ExecutionMode::Container(image), Some(runtime)) => {
                format!("{} ({})", image.full_image(), runtime)
            }
            _ => "local".to_string(),
        }
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let prepared = self.prepare(spec)?;
        let cmd_str = prepared.display();

        info!("Running: {}", spec.display());
        debug!("Command: {}", cmd_str);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            return Ok(ExecutionResult {
                run_id: "dry-run".to_string(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                duration_ms: 0,
            });
        }

        let started_at = Utc::now();
        let (exit_code, stdout, stderr) = tokio::task::spawn_blocking({
            let run_config = run_config.clone();
            let ci_mode = self.options.ci_mode;
            let log_handler = self.log_handler.clone();
            move || execute_blocking(prepared, run_config, ci_mode, log_handler)
        })
        .await
        .map_err(|e| RunnerError::ExecutionFailed(format!("execution task failed: {}", e)))??;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        if exit_code == 0 {
            info!("{} completed successfully in {}ms", spec.program, duration_ms);
        } else {
            error!(
                "{} failed with exit code {} after {}ms",
                spec.program, exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            run_id: uuid::Uuid::new_v4().to_string(),
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_container_args() {
        let spec = CommandSpec::new("terraform")
            .env("TF_IN_AUTOMATION", "1")
            .args(["apply", "-auto-approve"]);
        let image = ContainerImage::new("hashicorp/terraform", "1.6").passthrough(["AWS_REGION"]);
        let dir = PathBuf::from("/host/unit-test");

        let args = build_container_args(&spec, &image, Some(&dir), "infraprobe-test");

        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--name",
                "infraprobe-test",
                "-w",
                "/workspace",
                "-v",
                "/host/unit-test:/workspace",
                "-e",
                "TF_IN_AUTOMATION=1",
                "-e",
                "AWS_REGION",
                "--entrypoint",
                "terraform",
                "hashicorp/terraform:1.6",
                "apply",
                "-auto-approve",
            ]
        );
    }

    #[test]
    fn test_explicit_env_wins_over_passthrough() {
        let spec = CommandSpec::new("terraform").env("AWS_REGION", "eu-west-1");
        let image = ContainerImage::new("hashicorp/terraform", "1.6").passthrough(["AWS_REGION"]);

        let args = build_container_args(&spec, &image, None, "infraprobe-test");

        assert!(args.contains(&"AWS_REGION=eu-west-1".to_string()));
        assert!(!args.contains(&"AWS_REGION".to_string()));
    }

    #[test]
    fn test_container_prepare_names_container() {
        let options = ProcessRunnerOptions::new()
            .dry_run()
            .container(ContainerImage::terraform());
        let runner = ProcessRunner::with_runtime(ContainerRuntime::Podman, options);
        let spec = CommandSpec::new("terraform")
            .workdir("./unit-test")
            .arg("apply");

        let first = runner.prepare(&spec).unwrap();
        let second = runner.prepare(&spec).unwrap();

        let (runtime, name) = first.container.clone().unwrap();
        assert_eq!(runtime, ContainerRuntime::Podman);
        assert!(name.starts_with("infraprobe-"));
        let pos = first.args.iter().position(|a| a == "--name").unwrap();
        assert_eq!(first.args[pos + 1], name);
        // Each run gets its own container
        assert_ne!(first.container, second.container);
        assert_eq!(stop_container_args(&name), vec!["kill".to_string(), name]);
    }

    #[test]
    fn test_local_prepare_has_no_container() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::new().dry_run()).unwrap();
        let prepared = runner
            .prepare(&CommandSpec::new("terraform").arg("init"))
            .unwrap();
        assert!(prepared.container.is_none());
    }

    #[test]
    fn test_streamed_lines_go_to_sink() {
        let mut sink = Vec::new();
        let captured = collect_stream(
            "line one\nline two\n".as_bytes(),
            &mut sink,
            LogStream::Stdout,
            true,
            false,
            None,
        );

        assert_eq!(captured, "line one\nline two\n");
        assert_eq!(String::from_utf8(sink).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_nothing_echoed_without_streaming() {
        let mut sink = Vec::new();
        let captured = collect_stream(
            "quiet\n".as_bytes(),
            &mut sink,
            LogStream::Stderr,
            false,
            true,
            None,
        );

        assert_eq!(captured, "quiet\n");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_local_prepare_rejects_missing_workdir() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default()).unwrap();
        let spec = CommandSpec::new("terraform").workdir("/definitely/not/here");

        let result = runner.prepare(&spec);
        assert!(matches!(result, Err(RunnerError::InvalidWorkdir(_))));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::new().dry_run()).unwrap();
        assert!(runner.is_dry_run());

        let spec = CommandSpec::new("no-such-binary-anywhere").arg("apply");
        let result = runner.run(&spec, &RunConfig::default()).await.unwrap();

        assert!(result.success());
        assert_eq!(result.run_id, "dry-run");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_local_execution_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(ProcessRunnerOptions::default()).unwrap();
        let spec = CommandSpec::new("sh")
            .workdir(dir.path())
            .env("PROBE_VALUE", "vpc-123")
            .args(["-c", "echo $PROBE_VALUE; echo oops >&2; exit 3"]);

        let result = runner.run(&spec, &RunConfig::default()).await.unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "vpc-123\n");
        assert_eq!(result.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default()).unwrap();
        let spec = CommandSpec::new("sleep").arg("5");

        let result = runner.run(&spec, &RunConfig::default().timeout(1)).await;
        assert!(matches!(result, Err(RunnerError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default()).unwrap();
        let spec = CommandSpec::new("infraprobe-no-such-binary");

        let result = runner.run(&spec, &RunConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::SpawnFailed { .. })));
    }
}
