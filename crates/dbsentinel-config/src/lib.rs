//! # dbsentinel Config
//!
//! Configuration management for the dbsentinel monitor and watchdog.

mod env;
mod error;
mod loader;
mod schema;

pub use env::apply_env_overrides;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
