//! Shell command execution and background process supervision.

pub mod supervisor;
pub mod system;

pub use supervisor::{ProcessControl, ProcessError, ProcessSummary, ProcessSupervisor};
pub use system::{system_processes, SystemProcess};

use anyhow::Result;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, error};

/// Default ceiling for a foreground command.
pub const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// stdout and stderr lines, in the order the command wrote them
    pub output: String,
    pub exit_code: i32,
    pub success: bool,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Text handed back to the model: the output, or an `Error:` line when
    /// the command failed.
    pub fn to_tool_text(&self) -> String {
        match self.failure() {
            Some(failure) => format!("{}\n{}", failure, self.output)
                .trim_end()
                .to_string(),
            None if self.output.trim().is_empty() => {
                "Command executed successfully with no output.".to_string()
            }
            None => self.output.clone(),
        }
    }

    /// The `Error:` line for a command that timed out or exited non-zero.
    pub fn failure(&self) -> Option<String> {
        if self.timed_out {
            Some("Error: Command timed out.".to_string())
        } else if !self.success {
            Some(format!("Error: Command failed with exit code {}.", self.exit_code))
        } else {
            None
        }
    }
}

/// `sh -c <command>` with stdin closed and stderr merged into the stdout
/// pipe, so output lines keep the order the command wrote them in.
pub(crate) fn shell_command(command: &str) -> TokioCommand {
    let mut cmd = TokioCommand::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            // runs after stdio is set up: point fd 2 at the stdout pipe
            if libc::dup2(1, 2) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    cmd
}

/// Receives command output line by line while the command runs.
pub trait OutputReceiver: Send + Sync {
    /// Called when a new line of output is available
    fn on_output_line(&self, line: &str);
}

/// Discards every line.
pub struct NullReceiver;

impl OutputReceiver for NullReceiver {
    fn on_output_line(&self, _line: &str) {}
}

/// Runs shell commands to completion.
pub struct ShellExecutor {
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_SHELL_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn execute(&self, command: &str, working_dir: Option<&str>) -> Result<ExecutionResult> {
        self.execute_streaming_in_dir(command, &NullReceiver, working_dir)
            .await
    }

    /// Execute a command through `sh -c`, streaming each line to `receiver`.
    /// The child is killed if it outlives the executor's timeout.
    pub async fn execute_streaming_in_dir<R: OutputReceiver>(
        &self,
        command: &str,
        receiver: &R,
        working_dir: Option<&str>,
    ) -> Result<ExecutionResult> {
        debug!("Executing command: {} (in {:?})", command, working_dir);

        let mut cmd = shell_command(command);
        cmd.kill_on_drop(true);

        if let Some(dir) = working_dir {
            let expanded_dir = shellexpand::tilde(dir).to_string();
            cmd.current_dir(&expanded_dir);
        }

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("stdout was not captured"))?;

        let mut lines = BufReader::new(stdout).lines();
        let mut output = Vec::new();

        let read_all = async {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        receiver.on_output_line(&line);
                        output.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error reading command output: {}", e);
                        break;
                    }
                }
            }
            child.wait().await
        };

        let (status, timed_out) = match tokio::time::timeout(self.timeout, read_all).await {
            Ok(status) => (Some(status?), false),
            Err(_) => (None, true),
        };

        if timed_out {
            debug!("Command timed out after {:?}, killing it", self.timeout);
            let _ = child.kill().await;
        }

        let exit_code = status.and_then(|s| s.code()).unwrap_or(-1);
        let result = ExecutionResult {
            output: output.join("\n"),
            exit_code,
            success: !timed_out && exit_code == 0,
            timed_out,
        };

        debug!(
            "Command finished: exit_code={}, {} bytes of output",
            result.exit_code,
            result.output.len()
        );
        Ok(result)
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}
