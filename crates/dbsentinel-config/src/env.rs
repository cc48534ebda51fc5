//! Flat environment-variable overrides.
//!
//! The deployment template configures the service through a flat set of
//! variables (`SSH_HOST`, `HIGH_FREQ_CPU_THRESHOLD`, ...). Every variable
//! is optional; when present it overrides the corresponding TOML field.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::schema::{Config, ReportTime};

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidValue {
                field: name.to_string(),
                message: format!("cannot parse '{}'", raw),
            }
        }),
    }
}

fn bool_var(name: &str) -> Option<bool> {
    var(name).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "t" | "yes"))
}

/// Overlay environment variables onto `config`.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(v) = var("SSH_HOST") {
        config.ssh.host = v;
    }
    if let Some(v) = parse_var::<u16>("SSH_PORT")? {
        config.ssh.port = v;
    }
    if let Some(v) = var("SSH_USER") {
        config.ssh.user = v;
    }
    if let Some(v) = var("SSH_PASSWORD") {
        config.ssh.password = v;
    }
    if let Some(v) = var("SSH_HOSTKEY_ALG") {
        config.ssh.hostkey_algorithms = Some(v);
    }
    if let Some(v) = var("SSH_PUBKEY_TYPES") {
        config.ssh.pubkey_accepted_types = Some(v);
    }

    if let Some(v) = var("MYSQL_USER") {
        config.mysql.user = v;
    }
    if let Some(v) = var("MYSQL_PASSWORD") {
        config.mysql.password = v;
    }
    if let Some(v) = var("MYSQL_HOST") {
        config.mysql.host = v;
    }
    if let Some(v) = parse_var::<u16>("MYSQL_PORT")? {
        config.mysql.port = v;
    }
    if let Some(v) = var("MYSQL_DB") {
        config.mysql.database = v;
    }

    if let Some(v) = parse_var::<f64>("HIGH_FREQ_CPU_THRESHOLD")? {
        config.monitor.high_freq_cpu_threshold = v;
    }
    if let Some(v) = parse_var::<f64>("HIGH_FREQ_MEMORY_THRESHOLD")? {
        config.monitor.high_freq_memory_threshold = v;
    }
    if let Some(v) = parse_var::<u64>("HIGH_FREQ_MONITORING_INTERVAL")? {
        config.monitor.high_freq_interval_secs = v;
    }
    if let Some(v) = parse_var::<u64>("CONTINUOUS_MONITOR_INTERVAL_SECONDS")? {
        config.monitor.continuous_interval_secs = v;
    }
    if let Some(v) = parse_var::<u64>("MEMORY_MONITOR_INTERVAL_SECONDS")? {
        config.monitor.memory_interval_secs = v;
    }

    if let Some(v) = bool_var("EMAIL_ENABLED") {
        config.email.enabled = v;
    }
    if let Some(v) = var("SMTP_SERVER") {
        config.email.smtp_server = v;
    }
    if let Some(v) = parse_var::<u16>("SMTP_PORT")? {
        config.email.smtp_port = v;
    }
    if let Some(v) = var("SMTP_USER") {
        config.email.username = v;
    }
    if let Some(v) = var("SMTP_PASSWORD") {
        config.email.password = v;
    }
    if let Some(v) = var("FROM_ADDR") {
        config.email.from = v;
    }
    if let Some(v) = var("TO_ADDRS") {
        config.email.to = v
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(v) = var("EMAIL_REPORT_TIMES") {
        config.email.report_times = v
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ReportTime::from_str)
            .collect::<Result<Vec<_>, _>>()?;
    }

    if let Some(v) = bool_var("ENABLE_AI") {
        config.ai.enabled = v;
    }
    if let Some(v) = var("OPENAI_API_KEY") {
        config.ai.api_key = v;
    }
    if let Some(v) = var("OPENAI_API_URL") {
        config.ai.api_url = v;
    }
    if let Some(v) = var("OPENAI_MODEL") {
        config.ai.model = v;
    }
    if bool_var("ENABLE_PROXY").unwrap_or(false) {
        if let Some(v) = var("PROXY_URL") {
            config.ai.proxy_url = Some(v);
        }
    }

    if let Some(v) = var("LOG_DIR") {
        config.logging.dir = v.into();
    }
    if let Some(v) = bool_var("LOG_TO_FILE") {
        config.logging.to_file = v;
    }
    if let Some(v) = bool_var("LOG_TO_CONSOLE") {
        config.logging.to_console = v;
    }
    if let Some(v) = var("LOG_LEVEL") {
        config.logging.level = v.to_lowercase();
    }

    Ok(())
}
