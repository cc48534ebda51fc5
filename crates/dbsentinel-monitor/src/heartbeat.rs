//! Heartbeat emission.
//!
//! One line per continuous-loop tick, unconditionally. The watchdog and
//! the healthcheck probe both key off the marker token and the embedded
//! `ts=` timestamp, so the format here is load-bearing: marker, pid,
//! then a second-resolution local timestamp.

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use tracing::info;

/// Marker token the watchdog greps for.
pub const HEARTBEAT_MARKER: &str = "HEARTBEAT";

/// Timestamp format embedded in the heartbeat line.
pub const HEARTBEAT_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one heartbeat line.
pub fn heartbeat_line(pid: u32, now: DateTime<Local>) -> String {
    format!(
        "{} pid={} ts={}",
        HEARTBEAT_MARKER,
        pid,
        now.format(HEARTBEAT_TS_FORMAT)
    )
}

/// Emits heartbeat records for this process.
pub struct HeartbeatEmitter {
    pid: u32,
    emit_count: AtomicU64,
}

impl HeartbeatEmitter {
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            emit_count: AtomicU64::new(0),
        }
    }

    /// Append one heartbeat record to the log.
    pub fn emit(&self) {
        info!("{}", heartbeat_line(self.pid, Local::now()));
        self.emit_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of heartbeats emitted so far.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::SeqCst)
    }
}

impl Default for HeartbeatEmitter {
    fn default() -> Self {
        Self::new()
    }
}
