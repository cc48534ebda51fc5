//! Alert types and core trait definitions.

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::MonitorError;
use crate::metrics::MetricKind;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Digest-worthy but not urgent.
    Warning,
    /// Delivered immediately.
    High,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::High => write!(f, "HIGH"),
        }
    }
}

/// A threshold breach, queued for delivery.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    /// When the breach was observed.
    pub triggered_at: DateTime<Utc>,
    /// Metric that breached.
    pub metric: MetricKind,
    /// Configured limit.
    pub limit: f64,
    /// Observed value.
    pub observed: f64,
    /// Severity level.
    pub severity: AlertSeverity,
    /// Sampling source tag.
    pub source: String,
    /// Captured context (processlist excerpt, meminfo, ...).
    pub context: Option<String>,
    /// Advisory commentary, when enrichment succeeded.
    pub diagnosis: Option<String>,
}

impl AlertEvent {
    pub fn new(
        metric: MetricKind,
        limit: f64,
        observed: f64,
        severity: AlertSeverity,
        source: impl Into<String>,
    ) -> Self {
        Self {
            triggered_at: Utc::now(),
            metric,
            limit,
            observed,
            severity,
            source: source.into(),
            context: None,
            diagnosis: None,
        }
    }

    /// Attach captured context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Mail subject line.
    pub fn subject(&self) -> String {
        format!(
            "[{}] {} at {:.1}% (limit {:.1}%)",
            self.severity, self.metric, self.observed, self.limit
        )
    }

    /// Format for text output.
    pub fn format_text(&self) -> String {
        let mut text = format!(
            "[{}] {} - {} usage {:.1}% breached limit {:.1}% (source: {})",
            self.severity,
            self.triggered_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.metric,
            self.observed,
            self.limit,
            self.source
        );

        if let Some(ref context) = self.context {
            text.push_str(&format!("\n\n{}", context));
        }
        if let Some(ref diagnosis) = self.diagnosis {
            text.push_str(&format!("\n\nAI diagnosis:\n{}", diagnosis));
        }

        text
    }
}

/// Alert channel trait.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Send one message.
    async fn send(&self, subject: &str, body: &str) -> Result<(), MonitorError>;
}

/// Log channel (writes to tracing). Always configured, so every alert
/// leaves a trace even when mail is disabled or failing.
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), MonitorError> {
        if subject.contains("HIGH") {
            warn!("[ALERT] {}\n{}", subject, body);
        } else {
            info!("[ALERT] {}\n{}", subject, body);
        }
        Ok(())
    }
}
