//! Command execution for git and other helper programs.
//!
//! Programs are spawned directly with an argument vector (never through a
//! shell), with timeout support and output capture.

use crate::core::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Whether the command was killed due to timeout.
    pub timed_out: bool,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Returns combined stdout and stderr output.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Timeout for the command.
    pub timeout: Option<Duration>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: Some(Duration::from_secs(120)),
            env: Vec::new(),
        }
    }
}

impl ExecuteOptions {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Executor for running external programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes `program` with `args`, capturing stdout and stderr.
    pub async fn execute<I, S>(
        &self,
        program: &str,
        args: I,
        options: ExecuteOptions,
    ) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let start = std::time::Instant::now();

        if !Self::command_exists(program) {
            return Err(Error::CommandNotFound {
                command: program.to_string(),
            });
        }

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| Error::io("spawn command", e))?;

        let result = if let Some(timeout_duration) = options.timeout {
            match timeout(timeout_duration, wait_for_output(&mut child)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(program, ?timeout_duration, "command timed out, killing");
                    drop(child.kill().await);
                    return Ok(CommandOutput {
                        exit_code: 124,
                        stdout: String::new(),
                        stderr: "Command timed out".to_string(),
                        timed_out: true,
                        duration: start.elapsed(),
                    });
                },
            }
        } else {
            wait_for_output(&mut child).await
        };

        let (exit_code, stdout, stderr) = result?;

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
            timed_out: false,
            duration: start.elapsed(),
        })
    }

    /// Checks if a command exists in PATH.
    #[must_use]
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// Waits for the child to exit while draining both pipes.
async fn wait_for_output(child: &mut tokio::process::Child) -> Result<(i32, String, String)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_handle = tokio::spawn(drain(stdout));
    let stderr_handle = tokio::spawn(drain(stderr));

    let status = child
        .wait()
        .await
        .map_err(|e| Error::io("wait for command", e))?;

    let stdout = stdout_handle.await.map_err(|e| Error::Internal {
        message: format!("stdout task failed: {e}"),
    })?;
    let stderr = stderr_handle.await.map_err(|e| Error::Internal {
        message: format!("stderr task failed: {e}"),
    })?;

    Ok((status.code().unwrap_or(1), stdout, stderr))
}

async fn drain<R>(pipe: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if let Some(pipe) = pipe {
        let mut reader = BufReader::new(pipe);
        if let Err(e) = reader.read_to_end(&mut bytes).await {
            tracing::debug!(error = %e, "failed to read command output");
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
