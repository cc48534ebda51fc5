//! The watchdog loop.

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

use chrono::{Local, NaiveDateTime};
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

use dbsentinel_config::Config;

use crate::liveness::{LivenessJudge, LivenessState, find_last_heartbeat};
use crate::process::{find_monitor_pid, kill_monitor};

/// Image name the monitor process runs under.
const MONITOR_IMAGE: &str = "dbsentinel";

/// Long-running liveness supervisor for the monitor process.
pub struct Watchdog {
    config: Config,
}

impl Watchdog {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Newest heartbeat across today's log file, falling back to
    /// yesterday's around rotation.
    pub(crate) fn scan_last_heartbeat(&self) -> Option<NaiveDateTime> {
        let today = Local::now().date_naive();
        for date in [today, today.pred_opt()?] {
            let path = self.config.log_file_path(date);
            match find_last_heartbeat(&path) {
                Ok(Some(ts)) => return Some(ts),
                Ok(None) => continue,
                Err(err) => {
                    warn!(path = %path.display(), %err, "Could not read log tail");
                }
            }
        }
        None
    }

    /// Probe on a fixed interval until shutdown, signalling a restart
    /// when the judge's stale budget runs out.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let watchdog_config = self.config.watchdog.clone();
        let mut judge = LivenessJudge::new(&watchdog_config);

        let mut ticker = interval(watchdog_config.check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = watchdog_config.check_interval_secs,
            timeout_secs = watchdog_config.heartbeat_timeout_secs,
            max_stale_probes = watchdog_config.max_stale_probes,
            "Watchdog started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let last = self.scan_last_heartbeat();
                    let restart = judge.probe(Local::now().naive_local(), last);

                    match judge.state() {
                        LivenessState::Healthy => debug!(?last, "Monitor is healthy"),
                        LivenessState::Stale => warn!(
                            ?last,
                            consecutive = judge.consecutive_stale(),
                            "No fresh heartbeat"
                        ),
                        LivenessState::Unknown => debug!("Liveness unknown (grace period)"),
                    }

                    if restart {
                        self.signal_restart().await;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Watchdog shutting down");
                    break;
                }
            }
        }
    }

    /// Kill the monitor so the supervisor restarts it, then pause to
    /// give the replacement a head start before the next probe.
    async fn signal_restart(&self) {
        error!("Heartbeats stale past the retry budget; requesting restart");

        match find_monitor_pid(MONITOR_IMAGE) {
            Ok(Some(pid)) => {
                if let Err(err) = kill_monitor(pid) {
                    error!(pid, %err, "Failed to kill monitor process");
                }
            }
            Ok(None) => warn!("No monitor process found to restart"),
            Err(err) => error!(%err, "Process scan failed"),
        }

        sleep(self.config.watchdog.restart_delay()).await;
    }
}
