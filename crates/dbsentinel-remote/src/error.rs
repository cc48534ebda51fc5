//! Remote execution errors.

use thiserror::Error;

/// Remote execution error types.
///
/// All of these are transient from the monitor's point of view: a failed
/// call drops the current sample and the loop continues on its next tick.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The command process could not be spawned.
    #[error("Failed to spawn remote command: {0}")]
    Spawn(#[from] std::io::Error),

    /// The command did not complete within the per-call timeout.
    #[error("Remote command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },

    /// The transport itself failed (connection refused, auth, ...).
    #[error("Remote channel failure (exit {code}): {stderr}")]
    Channel { code: i32, stderr: String },

    /// All attempts exhausted.
    #[error("Remote command failed after {attempts} attempts: {command}")]
    RetriesExhausted { command: String, attempts: u32 },
}
