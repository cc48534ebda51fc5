//! # dbsentinel Watchdog
//!
//! Liveness supervision for the monitor process. The watchdog shares no
//! memory with the monitor: it tails the monitor's log for heartbeat
//! lines, judges staleness, and signals recovery by killing the monitor
//! so the enclosing supervisor restarts it.

mod error;
mod liveness;
mod probe;
mod process;
mod runner;

pub use error::WatchdogError;
pub use liveness::{
    HEARTBEAT_MARKER, LivenessJudge, LivenessState, find_last_heartbeat, parse_heartbeat_line,
};
pub use probe::probe_current_minute;
pub use process::{find_monitor_pid, kill_monitor};
pub use runner::Watchdog;
