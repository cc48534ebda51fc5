//! # dbsentinel Advisor
//!
//! Client for the advisory (incident diagnosis) service: an
//! OpenAI-compatible chat-completions endpoint, optionally reached
//! through a SOCKS forward proxy. Every call is best-effort; the caller
//! owns the timeout and degrades to an un-enriched alert on failure.

mod api;
mod client;
mod error;

pub use api::{ApiMessage, ApiRequest, ApiResponse};
pub use client::AdvisorClient;
pub use error::AdvisorError;
