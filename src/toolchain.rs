//! Toolchain - harness compilation and execution
//!
//! This module provides:
//! - The `Toolchain` trait the pipeline drives (compile, then run)
//! - `NativeToolchain`, which spawns the configured compiler and the harness
//!   binary directly, each bounded by a timeout
//!
//! The toolchain does NOT:
//! - Generate or decode harness code
//! - Compare outputs

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ToolchainConfig;
use crate::error::{HarnessError, Result, Stage};
use crate::workspace::{Workspace, HARNESS_BINARY, HARNESS_SOURCE};

/// Grace period for collecting output after a child was killed
const STREAM_DRAIN: Duration = Duration::from_millis(500);

/// Execution status (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Program exited normally with given exit code
    Exited(i32),
    /// Killed by signal
    Signaled(i32),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }

    /// Shell-style exit code (128 + signal for signaled processes)
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Exited(code) => *code,
            RunStatus::Signaled(sig) => 128 + sig,
        }
    }
}

/// Outcome of running a program
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    /// Wall clock time in milliseconds
    pub wall_time_ms: u64,
}

/// Builds and runs harnesses
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compile the workspace's harness, returning the binary path
    async fn compile(&self, workspace: &Workspace) -> Result<PathBuf>;

    /// Run a harness binary with the encoded case list as its only argument.
    ///
    /// A non-zero exit is a `Runtime` error; exceeding the time limit is a
    /// `Timeout` error.
    async fn run(&self, binary: &Path, cwd: &Path, encoded_cases: &str) -> Result<RunOutcome>;

    /// Identifies how binaries are built; a change invalidates cached builds
    fn build_identity(&self) -> String;
}

/// Toolchain that runs the configured compiler and the harness on the host
#[derive(Debug, Clone)]
pub struct NativeToolchain {
    config: ToolchainConfig,
}

impl NativeToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Toolchain for NativeToolchain {
    async fn compile(&self, workspace: &Workspace) -> Result<PathBuf> {
        let command = self
            .config
            .compile_command_for(HARNESS_SOURCE, HARNESS_BINARY);
        debug!("Compiling harness with {:?} in {:?}", command, workspace.root());

        let outcome = match execute(
            &command,
            workspace.root(),
            self.config.compile_timeout_ms,
            Stage::Compile,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(HarnessError::Io(e)) => {
                return Err(HarnessError::Compile {
                    diagnostic: format!(
                        "Failed to start compiler {:?}: {}",
                        command.first().map(String::as_str).unwrap_or_default(),
                        e
                    ),
                })
            }
            Err(e) => return Err(e),
        };

        if !outcome.status.is_success() {
            let diagnostic = if !outcome.stderr.is_empty() {
                outcome.stderr
            } else if !outcome.stdout.is_empty() {
                outcome.stdout
            } else {
                match outcome.status {
                    RunStatus::Signaled(_) => "Compiler crashed".to_string(),
                    RunStatus::Exited(code) => {
                        format!("Compilation failed with exit code {}", code)
                    }
                }
            };
            return Err(HarnessError::Compile { diagnostic });
        }

        info!(
            "Compiled harness {:?} in {}ms",
            workspace.binary_path(),
            outcome.wall_time_ms
        );
        Ok(workspace.binary_path())
    }

    async fn run(&self, binary: &Path, cwd: &Path, encoded_cases: &str) -> Result<RunOutcome> {
        let command = vec![
            binary.to_string_lossy().to_string(),
            encoded_cases.to_string(),
        ];
        let outcome = execute(
            &command,
            cwd,
            self.config.run_timeout_ms,
            Stage::Run,
        )
        .await?;

        if !outcome.status.is_success() {
            warn!(
                "Harness {:?} failed with {:?}",
                binary, outcome.status
            );
            return Err(HarnessError::Runtime {
                exit_code: outcome.status.exit_code(),
                stdout: outcome.stdout,
                stderr: outcome.stderr,
            });
        }

        debug!("Harness finished in {}ms", outcome.wall_time_ms);
        Ok(outcome)
    }

    fn build_identity(&self) -> String {
        self.config.compile_command.join(" ")
    }
}

/// Spawn `command` in `cwd` and wait for it at most `limit_ms`.
///
/// stdout and stderr are captured separately and are kept on timeout.
pub async fn execute(
    command: &[String],
    cwd: &Path,
    limit_ms: u64,
    stage: Stage,
) -> Result<RunOutcome> {
    let (program, args) = command.split_first().ok_or_else(|| {
        HarnessError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "No command specified for execution",
        ))
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = std::time::Instant::now();
    let mut child = cmd.spawn()?;

    let stdout_reader = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_reader = tokio::spawn(read_stream(child.stderr.take()));

    let waited = tokio::time::timeout(Duration::from_millis(limit_ms), child.wait()).await;
    let status = match waited {
        Ok(status) => Some(status?),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill {:?} after timeout: {}", program, e);
            }
            None
        }
    };
    let wall_time_ms = started.elapsed().as_millis() as u64;

    match status {
        Some(status) => Ok(RunOutcome {
            status: run_status(status),
            stdout: collect(stdout_reader).await,
            stderr: collect(stderr_reader).await,
            wall_time_ms,
        }),
        None => Err(HarnessError::Timeout {
            stage,
            limit_ms,
            stdout: drain(stdout_reader).await,
            stderr: drain(stderr_reader).await,
        }),
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("Stopped reading child output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Full output of a process that exited on its own
async fn collect(reader: JoinHandle<String>) -> String {
    reader.await.unwrap_or_else(|e| {
        warn!("Output reader failed: {}", e);
        String::new()
    })
}

/// Whatever a killed process left behind, waiting at most `STREAM_DRAIN`
async fn drain(reader: JoinHandle<String>) -> String {
    match tokio::time::timeout(STREAM_DRAIN, reader).await {
        Ok(Ok(text)) => text,
        _ => String::new(),
    }
}

#[cfg(unix)]
fn run_status(status: ExitStatus) -> RunStatus {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => RunStatus::Exited(code),
        (None, Some(sig)) => RunStatus::Signaled(sig),
        (None, None) => RunStatus::Exited(-1),
    }
}

#[cfg(not(unix))]
fn run_status(status: ExitStatus) -> RunStatus {
    RunStatus::Exited(status.code().unwrap_or(-1))
}
