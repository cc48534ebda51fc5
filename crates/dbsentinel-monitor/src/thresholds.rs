//! Threshold rules and the pure evaluator.
//!
//! Evaluation is a pure function of (sample, rule): replaying the same
//! sample sequence against the same rules yields the same events, with
//! no hysteresis or hidden state.

#[cfg(test)]
#[path = "thresholds_tests.rs"]
mod tests;

use dbsentinel_config::MonitorConfig;

use crate::alerts::{AlertEvent, AlertSeverity};
use crate::metrics::{MetricKind, MetricSample};

/// Which loop a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    HighFrequency,
    Periodic,
}

/// How an observed value is compared against the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Violated when the value is at or above the limit.
    AtOrAbove,
    /// Violated when the value is at or below the limit.
    AtOrBelow,
}

impl Comparison {
    pub fn violated(&self, value: f64, limit: f64) -> bool {
        match self {
            Comparison::AtOrAbove => value >= limit,
            Comparison::AtOrBelow => value <= limit,
        }
    }
}

/// A configured limit a metric must not cross.
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    pub metric: MetricKind,
    pub comparison: Comparison,
    pub limit: f64,
    pub cadence: Cadence,
}

impl ThresholdRule {
    /// Rule set for the configured thresholds: high-frequency CPU and
    /// memory ceilings plus the periodic memory ceiling.
    pub fn from_config(config: &MonitorConfig) -> Vec<ThresholdRule> {
        vec![
            ThresholdRule {
                metric: MetricKind::Cpu,
                comparison: Comparison::AtOrAbove,
                limit: config.high_freq_cpu_threshold,
                cadence: Cadence::HighFrequency,
            },
            ThresholdRule {
                metric: MetricKind::Memory,
                comparison: Comparison::AtOrAbove,
                limit: config.high_freq_memory_threshold,
                cadence: Cadence::HighFrequency,
            },
            ThresholdRule {
                metric: MetricKind::Memory,
                comparison: Comparison::AtOrAbove,
                limit: config.high_freq_memory_threshold,
                cadence: Cadence::Periodic,
            },
        ]
    }
}

/// Evaluate one sample against one rule.
///
/// A rule for a different metric never fires. High-frequency breaches
/// are High severity (delivered immediately); periodic breaches are
/// Warning severity (routed to the digest).
pub fn evaluate(sample: &MetricSample, rule: &ThresholdRule) -> Option<AlertEvent> {
    if sample.kind != rule.metric {
        return None;
    }
    if !rule.comparison.violated(sample.value, rule.limit) {
        return None;
    }

    let severity = match rule.cadence {
        Cadence::HighFrequency => AlertSeverity::High,
        Cadence::Periodic => AlertSeverity::Warning,
    };

    Some(AlertEvent::new(
        sample.kind,
        rule.limit,
        sample.value,
        severity,
        sample.source.clone(),
    ))
}
