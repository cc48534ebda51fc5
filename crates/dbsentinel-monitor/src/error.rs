//! Monitor errors.

use thiserror::Error;

use dbsentinel_remote::RemoteError;

/// Monitor error types.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The remote call backing a sample failed.
    #[error("Remote sampling failed: {0}")]
    Remote(#[from] RemoteError),

    /// A command produced output we could not parse.
    #[error("Failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    /// Alert delivery failed.
    #[error("Alert delivery failed: {0}")]
    Delivery(String),

    /// Advisory enrichment failed.
    #[error("Advisory request failed: {0}")]
    Advisory(String),

    /// SMTP transport-level failure (authentication, connection, ...).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Invalid schedule expression.
    #[error("Invalid digest schedule: {0}")]
    Schedule(String),
}
