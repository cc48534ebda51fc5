//! Metric samples and remote collection.
//!
//! The collector issues plain shell and `mysql -e` commands through the
//! remote execution channel and parses their output with pure functions
//! so the parsing is testable against captured fixtures.

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use dbsentinel_config::MysqlConfig;
use dbsentinel_remote::RemoteExecutor;

use crate::error::MonitorError;

/// Kind of metric a sample carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Cpu => write!(f, "cpu"),
            MetricKind::Memory => write!(f, "memory"),
        }
    }
}

/// One observed metric value. Immutable once created.
#[derive(Debug, Clone)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub kind: MetricKind,
    pub value: f64,
    pub source: String,
}

impl MetricSample {
    pub fn new(kind: MetricKind, value: f64, source: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            value,
            source: source.into(),
        }
    }
}

/// Baseline facts gathered once at start-up.
#[derive(Debug, Clone)]
pub struct BaselineMetrics {
    pub cpuinfo: String,
    pub global_variables: String,
}

/// Collects metrics from the monitored host.
pub struct MetricsCollector {
    executor: Arc<dyn RemoteExecutor>,
    mysql: MysqlConfig,
}

impl MetricsCollector {
    pub fn new(executor: Arc<dyn RemoteExecutor>, mysql: MysqlConfig) -> Self {
        Self { executor, mysql }
    }

    /// `mysql` invocation prefix for remote queries.
    fn mysql_base(&self) -> String {
        format!(
            "mysql -u'{}' -p'{}' -h'{}'",
            self.mysql.user, self.mysql.password, self.mysql.host
        )
    }

    async fn run(&self, command: &str) -> Result<String, MonitorError> {
        debug!(command, "Running remote command");
        let output = self.executor.execute(command).await?;
        Ok(output.stdout)
    }

    /// Resolve the PID of the `mysqld` process on the monitored host.
    pub async fn mysqld_pid(&self) -> Result<u32, MonitorError> {
        let output = self.run("pidof mysqld").await?;
        parse_pidof(&output).ok_or_else(|| MonitorError::Parse {
            what: "pidof output",
            detail: output.trim().to_string(),
        })
    }

    /// Current CPU usage percent for the given PID.
    pub async fn cpu_usage_for_pid(&self, pid: u32) -> Result<MetricSample, MonitorError> {
        let output = self.run(&format!("top -b -n 1 -p {}", pid)).await?;
        let value = parse_top_cpu(&output, pid).ok_or_else(|| MonitorError::Parse {
            what: "top output",
            detail: format!("no row for pid {}", pid),
        })?;
        Ok(MetricSample::new(MetricKind::Cpu, value, "top"))
    }

    /// Current used-memory percent on the monitored host.
    pub async fn memory_usage_percent(&self) -> Result<MetricSample, MonitorError> {
        let output = self.run("free -m").await?;
        let value = parse_free_memory_percent(&output).ok_or_else(|| MonitorError::Parse {
            what: "free output",
            detail: output.trim().to_string(),
        })?;
        Ok(MetricSample::new(MetricKind::Memory, value, "free"))
    }

    /// Raw `/proc/meminfo` for the deep memory pass.
    pub async fn meminfo(&self) -> Result<String, MonitorError> {
        self.run("cat /proc/meminfo").await
    }

    /// Top five longest-running queries, excluding sleepers, our own
    /// session and the event scheduler.
    pub async fn processlist(&self) -> Result<String, MonitorError> {
        let command = format!(
            "{} -e \"SELECT ID, USER, HOST, DB, COMMAND, TIME, STATE, INFO \
             FROM information_schema.PROCESSLIST \
             WHERE COMMAND != 'Sleep' AND ID != CONNECTION_ID() \
             AND USER != 'event_scheduler' \
             ORDER BY TIME DESC LIMIT 5\" --table",
            self.mysql_base()
        );
        self.run(&command).await
    }

    /// One-shot baseline collection. Failures here are non-fatal; the
    /// caller logs and moves on to the loops.
    pub async fn baseline(&self) -> Result<BaselineMetrics, MonitorError> {
        info!("Collecting baseline metrics");
        let cpuinfo = self.run("cat /proc/cpuinfo").await?;
        let global_variables = self
            .run(&format!(
                "{} -e \"SHOW GLOBAL VARIABLES;\"",
                self.mysql_base()
            ))
            .await?;
        Ok(BaselineMetrics {
            cpuinfo,
            global_variables,
        })
    }
}

/// First PID from `pidof` output.
pub fn parse_pidof(output: &str) -> Option<u32> {
    output.split_whitespace().next()?.parse().ok()
}

/// CPU percent for `pid` from `top -b -n 1 -p <pid>` output.
pub fn parse_top_cpu(output: &str, pid: u32) -> Option<f64> {
    let pid_str = pid.to_string();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() == Some(&pid_str.as_str()) {
            // Column 8 is %CPU; some locales print a decimal comma.
            let raw = parts.get(8)?;
            return raw.replace(',', ".").parse().ok();
        }
    }
    None
}

/// Used-memory percent from `free -m` output, rounded to two decimals.
pub fn parse_free_memory_percent(output: &str) -> Option<f64> {
    let line = output.lines().nth(1)?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    let total: f64 = parts.get(1)?.parse().ok()?;
    let used: f64 = parts.get(2)?.parse().ok()?;
    if total <= 0.0 {
        return None;
    }
    Some((used / total * 100.0 * 100.0).round() / 100.0)
}
