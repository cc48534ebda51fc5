//! The monitor's sampling loops.
//!
//! Three independent loops on fixed tick intervals. Each loop owns its
//! tick body; a failed remote call drops the sample and the loop keeps
//! going. Nothing in any tick may prevent the continuous loop's
//! heartbeat from being written.

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use dbsentinel_config::MonitorConfig;

use crate::analysis::analyze_processlist;
use crate::dispatch::DispatcherHandle;
use crate::heartbeat::HeartbeatEmitter;
use crate::metrics::{MetricKind, MetricsCollector};
use crate::thresholds::{Cadence, ThresholdRule, evaluate};

/// Lines of `/proc/meminfo` worth attaching to a memory event.
const MEMINFO_CONTEXT_LINES: usize = 12;

/// Long-running monitor over one remote host.
pub struct Monitor {
    config: MonitorConfig,
    collector: MetricsCollector,
    dispatcher: DispatcherHandle,
    heartbeat: HeartbeatEmitter,
    rules: Vec<ThresholdRule>,
    mysqld_pid: RwLock<Option<u32>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        collector: MetricsCollector,
        dispatcher: DispatcherHandle,
    ) -> Self {
        let rules = ThresholdRule::from_config(&config);
        Self {
            config,
            collector,
            dispatcher,
            heartbeat: HeartbeatEmitter::new(),
            rules,
            mysqld_pid: RwLock::new(None),
        }
    }

    /// Heartbeats emitted so far.
    pub fn heartbeat_count(&self) -> u64 {
        self.heartbeat.emit_count()
    }

    /// Run all sampling loops until shutdown.
    pub async fn run(self, shutdown: &broadcast::Sender<()>) {
        // Baseline once at start; failures are logged, never fatal.
        match self.collector.baseline().await {
            Ok(baseline) => info!(
                cpuinfo_bytes = baseline.cpuinfo.len(),
                variables_bytes = baseline.global_variables.len(),
                "Baseline metrics collected"
            ),
            Err(err) => warn!(%err, "Baseline collection failed"),
        }

        let monitor = Arc::new(self);
        let high_freq = tokio::spawn(monitor.clone().high_freq_loop(shutdown.subscribe()));
        let continuous = tokio::spawn(monitor.clone().continuous_loop(shutdown.subscribe()));
        let memory = tokio::spawn(monitor.clone().memory_loop(shutdown.subscribe()));

        let _ = tokio::join!(high_freq, continuous, memory);
        info!("All sampling loops stopped");
    }

    async fn high_freq_loop(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.config.high_freq_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.high_freq_interval_secs,
            "High-frequency monitoring loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.high_freq_tick().await,
                _ = shutdown.recv() => {
                    info!("High-frequency loop shutting down");
                    break;
                }
            }
        }
    }

    async fn continuous_loop(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.config.continuous_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.continuous_interval_secs,
            "Continuous monitoring loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.continuous_tick().await,
                _ = shutdown.recv() => {
                    info!("Continuous loop shutting down");
                    break;
                }
            }
        }
    }

    async fn memory_loop(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.config.memory_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.memory_interval_secs,
            "Memory monitoring loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.memory_tick().await,
                _ = shutdown.recv() => {
                    info!("Memory loop shutting down");
                    break;
                }
            }
        }
    }

    /// High-frequency pass: CPU for the mysqld PID, then host memory,
    /// each against the high-frequency rules.
    pub(crate) async fn high_freq_tick(&self) {
        if let Some(pid) = self.ensure_pid().await {
            match self.collector.cpu_usage_for_pid(pid).await {
                Ok(sample) => self.evaluate_and_dispatch(&sample, Cadence::HighFrequency).await,
                Err(err) => {
                    warn!(%err, pid, "CPU sample dropped");
                    // The row may be gone because mysqld restarted.
                    *self.mysqld_pid.write().await = None;
                }
            }
        }

        match self.collector.memory_usage_percent().await {
            Ok(sample) => self.evaluate_and_dispatch(&sample, Cadence::HighFrequency).await,
            Err(err) => warn!(%err, "Memory sample dropped"),
        }
    }

    /// Continuous pass: best-effort snapshot, then the heartbeat.
    /// The heartbeat is appended no matter what happened above it.
    pub(crate) async fn continuous_tick(&self) {
        if let Err(err) = self.snapshot().await {
            warn!(%err, "Snapshot failed; heartbeat unaffected");
        }
        self.heartbeat.emit();
    }

    /// Deep memory pass against the periodic rules.
    pub(crate) async fn memory_tick(&self) {
        match self.collector.memory_usage_percent().await {
            Ok(sample) => self.evaluate_and_dispatch(&sample, Cadence::Periodic).await,
            Err(err) => warn!(%err, "Memory diagnostic sample dropped"),
        }
    }

    async fn snapshot(&self) -> Result<(), crate::error::MonitorError> {
        let memory = self.collector.memory_usage_percent().await?;
        debug!(memory_percent = memory.value, "Snapshot");
        Ok(())
    }

    async fn evaluate_and_dispatch(&self, sample: &crate::metrics::MetricSample, cadence: Cadence) {
        for rule in self.rules.iter().filter(|r| r.cadence == cadence) {
            let Some(mut event) = evaluate(sample, rule) else {
                continue;
            };
            warn!(
                metric = %sample.kind,
                observed = sample.value,
                limit = rule.limit,
                "Threshold breached"
            );

            event = match (sample.kind, cadence) {
                // Capture what the server is doing at the moment of a
                // CPU spike.
                (MetricKind::Cpu, Cadence::HighFrequency) => match self.collector.processlist().await {
                    Ok(table) => match analyze_processlist(&table) {
                        Some(perf) => event.with_context(perf.format_text()),
                        None => event,
                    },
                    Err(err) => {
                        warn!(%err, "Failed to capture processlist context");
                        event
                    }
                },
                (MetricKind::Memory, Cadence::Periodic) => match self.collector.meminfo().await {
                    Ok(info) => {
                        let excerpt: Vec<&str> =
                            info.lines().take(MEMINFO_CONTEXT_LINES).collect();
                        event.with_context(excerpt.join("\n"))
                    }
                    Err(err) => {
                        warn!(%err, "Failed to capture meminfo context");
                        event
                    }
                },
                _ => event,
            };

            self.dispatcher.dispatch(event);
        }
    }

    /// Resolve and cache the mysqld PID; `None` when the host cannot
    /// tell us (the next tick will try again).
    async fn ensure_pid(&self) -> Option<u32> {
        if let Some(pid) = *self.mysqld_pid.read().await {
            return Some(pid);
        }
        match self.collector.mysqld_pid().await {
            Ok(pid) => {
                info!(pid, "Resolved mysqld PID");
                *self.mysqld_pid.write().await = Some(pid);
                Some(pid)
            }
            Err(err) => {
                warn!(%err, "Could not resolve mysqld PID");
                None
            }
        }
    }
}
