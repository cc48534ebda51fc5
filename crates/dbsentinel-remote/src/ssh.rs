//! SSH-backed remote executor.
//!
//! Thin wrapper over the system ssh client. Password authentication is
//! delegated to `sshpass`, fed through the `SSHPASS` environment variable
//! so the credential never appears in the process list.

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use dbsentinel_config::SshConfig;

use crate::error::RemoteError;
use crate::executor::{CommandOutput, RemoteExecutor};

/// ssh exit code for a transport-level failure (connection, auth).
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Executes commands on the monitored host over ssh.
pub struct SshExecutor {
    config: SshConfig,
}

impl SshExecutor {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Destination in `user@host` form.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.config.user, self.config.host)
    }

    /// Argument vector for one ssh invocation (without the leading binary).
    fn build_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-e".to_string(),
            "ssh".to_string(),
            "-p".to_string(),
            self.config.port.to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_secs),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "BatchMode=no".to_string(),
        ];

        if let Some(ref algs) = self.config.hostkey_algorithms {
            args.push("-o".to_string());
            args.push(format!("HostKeyAlgorithms={}", algs));
        }
        if let Some(ref types) = self.config.pubkey_accepted_types {
            args.push("-o".to_string());
            args.push(format!("PubkeyAcceptedKeyTypes={}", types));
        }

        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    async fn run_once(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let child = Command::new("sshpass")
            .args(self.build_args(command))
            .env("SSHPASS", &self.config.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let secs = self.config.command_timeout_secs;
        let output = timeout(self.config.command_timeout(), child.wait_with_output())
            .await
            .map_err(|_| RemoteError::Timeout {
                command: command.to_string(),
                secs,
            })??;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if result.exit_code == SSH_TRANSPORT_FAILURE {
            return Err(RemoteError::Channel {
                code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        if !result.stderr.is_empty() {
            warn!(command, stderr = %result.stderr.trim(), "Remote command wrote to stderr");
        }

        Ok(result)
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    /// Execute a command on the monitored host.
    ///
    /// Transport failures are retried up to `command_retries` extra
    /// attempts; a timeout is returned immediately since the next tick
    /// will sample again anyway.
    async fn execute(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let attempts = self.config.command_retries + 1;

        for attempt in 1..=attempts {
            match self.run_once(command).await {
                Ok(output) => return Ok(output),
                Err(err @ RemoteError::Timeout { .. }) => return Err(err),
                Err(err) => {
                    debug!(command, attempt, %err, "Remote attempt failed");
                    if attempt == attempts {
                        warn!(command, %err, "Remote attempts exhausted");
                        return Err(RemoteError::RetriesExhausted {
                            command: command.to_string(),
                            attempts,
                        });
                    }
                }
            }
        }

        unreachable!("attempt loop always returns")
    }
}
