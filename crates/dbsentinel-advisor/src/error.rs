//! Advisor errors.

use thiserror::Error;

/// Advisory client error types.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Client construction failed (bad proxy URL, TLS setup).
    #[error("Failed to build advisory client: {0}")]
    Build(String),

    /// Network-level failure.
    #[error("Advisory network error: {0}")]
    Network(String),

    /// The endpoint returned a non-success status.
    #[error("Advisory API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response carried no usable text.
    #[error("Advisory response contained no content")]
    EmptyResponse,
}
