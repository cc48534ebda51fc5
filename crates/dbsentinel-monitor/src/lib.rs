//! # dbsentinel Monitor
//!
//! Threshold monitoring for a remote MySQL host.
//!
//! ## Features
//!
//! - CPU/memory sampling over the remote execution channel
//! - Pure threshold evaluation producing alert events
//! - Immediate email alerts and scheduled daily digests
//! - Unconditional heartbeat emission for the watchdog

pub mod alert_channels;
pub mod alerts;
pub mod analysis;
pub mod digest;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod metrics;
pub mod sampler;
pub mod thresholds;

pub use alert_channels::EmailChannel;
pub use alerts::{AlertChannel, AlertEvent, AlertSeverity, LogChannel};
pub use analysis::QueryPerformance;
pub use digest::{DigestBuffer, DigestFlusher, DigestSchedule};
pub use dispatch::{AlertDispatcher, Advisory, DispatcherHandle};
pub use error::MonitorError;
pub use heartbeat::{HEARTBEAT_MARKER, HeartbeatEmitter};
pub use metrics::{MetricKind, MetricSample, MetricsCollector};
pub use sampler::Monitor;
pub use thresholds::{Cadence, Comparison, ThresholdRule};
