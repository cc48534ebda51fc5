//! One-shot liveness probe.
//!
//! This is what the supervising runtime's healthcheck executes: succeed
//! iff the log tail holds a heartbeat stamped within the current date
//! and minute. Interval, timeout, retries and start period all belong
//! to the supervisor, not to this probe.

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::WatchdogError;
use crate::liveness::HEARTBEAT_MARKER;

/// Lines of tail searched by the probe.
const TAIL_LINES: usize = 200;

/// Check for a heartbeat in the current minute window.
pub fn probe_current_minute(
    log_path: &Path,
    now: DateTime<Local>,
) -> Result<bool, WatchdogError> {
    if !log_path.exists() {
        return Ok(false);
    }

    let needle = format!("ts={}", now.format("%Y-%m-%d %H:%M"));
    let content = fs::read_to_string(log_path)?;
    let lines: Vec<&str> = content.lines().collect();

    Ok(lines
        .iter()
        .rev()
        .take(TAIL_LINES)
        .any(|line| line.contains(HEARTBEAT_MARKER) && line.contains(&needle)))
}
