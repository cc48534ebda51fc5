//! Locating and signalling the monitor process.
//!
//! The restart primitive is deliberately blunt: SIGKILL the monitor and
//! let the enclosing supervisor bring it back. The watchdog never tries
//! to restart anything itself.

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

use std::fs;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, info};

use crate::error::WatchdogError;

/// Subcommand that marks the monitor process.
const MONITOR_COMMAND: &str = "run";

/// Subcommand that marks the watchdog itself.
const WATCHDOG_COMMAND: &str = "watchdog";

/// Whether a `/proc/<pid>/cmdline` argument vector belongs to the
/// monitor process for `image`.
pub(crate) fn cmdline_matches(args: &[&str], image: &str) -> bool {
    let is_image = args
        .first()
        .is_some_and(|argv0| argv0.rsplit('/').next() == Some(image));
    is_image
        && args.iter().any(|a| *a == MONITOR_COMMAND)
        && !args.iter().any(|a| *a == WATCHDOG_COMMAND)
}

/// Scan `/proc` for the monitor process.
///
/// Returns the first matching PID that is not this process, or `None`
/// when the monitor is not running (already dead, or not yet started).
pub fn find_monitor_pid(image: &str) -> Result<Option<i32>, WatchdogError> {
    let own_pid = std::process::id() as i32;

    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|n| n.parse::<i32>().ok()) else {
            continue;
        };
        if pid == own_pid {
            continue;
        }

        let Ok(raw) = fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let cmdline = String::from_utf8_lossy(&raw);
        let args: Vec<&str> = cmdline.split('\0').filter(|a| !a.is_empty()).collect();

        if cmdline_matches(&args, image) {
            debug!(pid, ?args, "Found monitor process");
            return Ok(Some(pid));
        }
    }
    Ok(None)
}

/// SIGKILL the given monitor PID.
pub fn kill_monitor(pid: i32) -> Result<(), WatchdogError> {
    info!(pid, "Killing monitor process");
    kill(Pid::from_raw(pid), Signal::SIGKILL).map_err(|e| WatchdogError::Signal {
        pid,
        reason: e.to_string(),
    })
}
