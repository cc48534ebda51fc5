//! Heartbeat parsing and the liveness state machine.

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use dbsentinel_config::WatchdogConfig;

use crate::error::WatchdogError;

/// Marker token in heartbeat lines. Must match what the monitor writes.
pub const HEARTBEAT_MARKER: &str = "HEARTBEAT";

/// Timestamp format embedded after `ts=` in heartbeat lines.
pub const HEARTBEAT_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How far back into the log tail a scan looks.
const TAIL_LINES: usize = 200;

/// Liveness of the monitor as judged from its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// A fresh heartbeat was observed.
    Healthy,
    /// No heartbeat within the staleness window.
    Stale,
    /// Before the first counted probe, or inside a grace period.
    Unknown,
}

impl std::fmt::Display for LivenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivenessState::Healthy => write!(f, "healthy"),
            LivenessState::Stale => write!(f, "stale"),
            LivenessState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Extract the heartbeat timestamp from one log line.
///
/// Returns `None` for lines without the marker or with an unparseable
/// `ts=` field; the scanner just keeps looking further back.
pub fn parse_heartbeat_line(line: &str) -> Option<NaiveDateTime> {
    if !line.contains(HEARTBEAT_MARKER) {
        return None;
    }
    let start = line.find("ts=")? + 3;
    let raw = line.get(start..start + 19)?;
    NaiveDateTime::parse_from_str(raw, HEARTBEAT_TS_FORMAT).ok()
}

/// Most recent heartbeat timestamp in the tail of the given log file.
///
/// A missing file reads as "no heartbeat" rather than an error: right
/// after rotation or first start the file legitimately does not exist.
pub fn find_last_heartbeat(path: &Path) -> Result<Option<NaiveDateTime>, WatchdogError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();
    let tail = lines.iter().rev().take(TAIL_LINES);

    for line in tail {
        if let Some(ts) = parse_heartbeat_line(line) {
            return Ok(Some(ts));
        }
    }
    Ok(None)
}

/// The liveness state machine.
///
/// UNKNOWN → HEALTHY ⇄ STALE; `max_stale_probes` consecutive stale
/// probes emit exactly one restart request, then the judge resets to
/// UNKNOWN behind a fresh grace period.
pub struct LivenessJudge {
    timeout: chrono::Duration,
    grace: chrono::Duration,
    max_stale_probes: u32,
    state: LivenessState,
    consecutive_stale: u32,
    grace_until: Option<NaiveDateTime>,
}

impl LivenessJudge {
    pub fn new(config: &WatchdogConfig) -> Self {
        Self {
            timeout: chrono::Duration::seconds(config.heartbeat_timeout_secs as i64),
            grace: chrono::Duration::seconds(config.grace_period_secs as i64),
            max_stale_probes: config.max_stale_probes,
            state: LivenessState::Unknown,
            consecutive_stale: 0,
            grace_until: None,
        }
    }

    /// Current state, as of the last probe.
    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// Consecutive stale probes counted so far.
    pub fn consecutive_stale(&self) -> u32 {
        self.consecutive_stale
    }

    /// Feed one probe observation. Returns `true` when the stale budget
    /// is exhausted and a restart must be signalled, exactly once per
    /// escalation; the judge then re-arms behind a grace period.
    pub fn probe(&mut self, now: NaiveDateTime, last_heartbeat: Option<NaiveDateTime>) -> bool {
        let grace_until = *self
            .grace_until
            .get_or_insert_with(|| now + self.grace);
        if now < grace_until {
            self.state = LivenessState::Unknown;
            return false;
        }

        let fresh = last_heartbeat
            .is_some_and(|hb| now.signed_duration_since(hb) <= self.timeout);

        if fresh {
            self.state = LivenessState::Healthy;
            self.consecutive_stale = 0;
            return false;
        }

        self.state = LivenessState::Stale;
        self.consecutive_stale += 1;

        if self.consecutive_stale >= self.max_stale_probes {
            self.state = LivenessState::Unknown;
            self.consecutive_stale = 0;
            self.grace_until = Some(now + self.grace);
            return true;
        }
        false
    }
}
