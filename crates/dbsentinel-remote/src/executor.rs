//! Remote executor trait and local fallback implementation.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::error::RemoteError;

/// Output of a remotely executed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// True when the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability to run a command on the monitored host.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Execute a command and collect its output.
    async fn execute(&self, command: &str) -> Result<CommandOutput, RemoteError>;
}

/// Executor that runs commands on the local machine through `sh -c`.
///
/// Lets the collector run against the local host in tests and smoke
/// runs; production sampling goes through [`crate::SshExecutor`].
pub struct LocalExecutor {
    timeout_secs: u64,
}

impl LocalExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn execute(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| RemoteError::Timeout {
                command: command.to_string(),
                secs: self.timeout_secs,
            })??;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if !result.stderr.is_empty() {
            warn!(command, stderr = %result.stderr.trim(), "Command wrote to stderr");
        }

        Ok(result)
    }
}
