//! # dbsentinel Remote
//!
//! Remote execution channel for the monitored database host.
//!
//! The monitor only ever needs one capability from the transport:
//! run a command, get back stdout/stderr/exit code. [`RemoteExecutor`]
//! captures that; [`SshExecutor`] is the production implementation on
//! top of the system ssh client.

mod error;
mod executor;
mod ssh;

pub use error::RemoteError;
pub use executor::{CommandOutput, LocalExecutor, RemoteExecutor};
pub use ssh::SshExecutor;
