//! Watchdog errors.

use thiserror::Error;

/// Watchdog error types.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: i32, reason: String },
}
