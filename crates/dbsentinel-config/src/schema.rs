//! Configuration schema definitions.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub mysql: MysqlConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

/// SSH connection settings for the monitored host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Host-key algorithm allowlist passed through to the ssh client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostkey_algorithms: Option<String>,

    /// Accepted public-key algorithm allowlist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey_accepted_types: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Extra attempts after a failed remote call.
    #[serde(default = "default_command_retries")]
    pub command_retries: u32,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ssh_port(),
            user: String::new(),
            password: String::new(),
            hostkey_algorithms: None,
            pubkey_accepted_types: None,
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
            command_retries: default_command_retries(),
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    10
}

fn default_command_retries() -> u32 {
    1
}

impl SshConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// MySQL client settings used for remote `mysql -e` invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_mysql_host")]
    pub host: String,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    #[serde(default)]
    pub database: String,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: default_mysql_host(),
            port: default_mysql_port(),
            database: String::new(),
        }
    }
}

fn default_mysql_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

/// Sampling cadences and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// High-frequency loop tick in seconds.
    #[serde(default = "default_high_freq_interval")]
    pub high_freq_interval_secs: u64,

    /// CPU percent at or above which a High alert fires.
    #[serde(default = "default_cpu_threshold")]
    pub high_freq_cpu_threshold: f64,

    /// Memory percent at or above which a High alert fires.
    #[serde(default = "default_memory_threshold")]
    pub high_freq_memory_threshold: f64,

    /// Continuous loop tick in seconds. Doubles as the heartbeat
    /// cadence: one heartbeat per tick, unconditionally.
    #[serde(default = "default_continuous_interval")]
    pub continuous_interval_secs: u64,

    /// Memory-focused diagnostic loop tick in seconds.
    #[serde(default = "default_memory_interval")]
    pub memory_interval_secs: u64,

    /// Grace period for in-flight work on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            high_freq_interval_secs: default_high_freq_interval(),
            high_freq_cpu_threshold: default_cpu_threshold(),
            high_freq_memory_threshold: default_memory_threshold(),
            continuous_interval_secs: default_continuous_interval(),
            memory_interval_secs: default_memory_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

fn default_high_freq_interval() -> u64 {
    10
}

fn default_cpu_threshold() -> f64 {
    80.0
}

fn default_memory_threshold() -> f64 {
    90.0
}

fn default_continuous_interval() -> u64 {
    10
}

fn default_memory_interval() -> u64 {
    1800
}

fn default_shutdown_grace() -> u64 {
    10
}

impl MonitorConfig {
    pub fn high_freq_interval(&self) -> Duration {
        Duration::from_secs(self.high_freq_interval_secs)
    }

    pub fn continuous_interval(&self) -> Duration {
        Duration::from_secs(self.continuous_interval_secs)
    }

    pub fn memory_interval(&self) -> Duration {
        Duration::from_secs(self.memory_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Email delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_server: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: Vec<String>,

    /// Daily digest flush instants.
    #[serde(default = "default_report_times")]
    pub report_times: Vec<ReportTime>,

    #[serde(default = "default_email_retries")]
    pub max_retries: u32,

    #[serde(default = "default_email_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: Vec::new(),
            report_times: default_report_times(),
            max_retries: default_email_retries(),
            retry_delay_secs: default_email_retry_delay(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_report_times() -> Vec<ReportTime> {
    vec![
        ReportTime { hour: 9, minute: 0 },
        ReportTime {
            hour: 23,
            minute: 59,
        },
    ]
}

fn default_email_retries() -> u32 {
    3
}

fn default_email_retry_delay() -> u64 {
    30
}

impl EmailConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Advisory (AI diagnosis) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Forward proxy for the advisory endpoint, e.g. `socks5h://127.0.0.1:1080`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,

    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            api_url: default_api_url(),
            model: default_model(),
            proxy_url: None,
            timeout_secs: default_ai_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging sinks and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_true")]
    pub to_file: bool,

    #[serde(default = "default_true")]
    pub to_console: bool,

    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            to_file: default_true(),
            to_console: default_true(),
            level: default_log_level(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Watchdog probe and escalation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Probe cadence in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Heartbeat age past which a probe reads Stale.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,

    /// Consecutive Stale probes before a restart is signalled.
    #[serde(default = "default_max_stale_probes")]
    pub max_stale_probes: u32,

    /// Start-up window during which probes do not count.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Pause after signalling a restart.
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            max_stale_probes: default_max_stale_probes(),
            grace_period_secs: default_grace_period(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

fn default_check_interval() -> u64 {
    60
}

fn default_heartbeat_timeout() -> u64 {
    120
}

fn default_max_stale_probes() -> u32 {
    3
}

fn default_grace_period() -> u64 {
    60
}

fn default_restart_delay() -> u64 {
    10
}

impl WatchdogConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

/// A wall-clock instant of day (HH:MM) for digest flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportTime {
    pub hour: u8,
    pub minute: u8,
}

impl ReportTime {
    /// Six-field cron expression firing daily at this instant.
    pub fn to_cron_expr(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl FromStr for ReportTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            field: "email.report_times".to_string(),
            message: format!("expected HH:MM, got '{}'", s),
        };

        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for ReportTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ReportTime {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ReportTime> for String {
    fn from(t: ReportTime) -> Self {
        t.to_string()
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// Called once at start-up; any error here is fatal so the process
    /// never runs partially configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssh.host.is_empty() {
            return Err(ConfigError::MissingField("ssh.host".to_string()));
        }
        if self.ssh.user.is_empty() {
            return Err(ConfigError::MissingField("ssh.user".to_string()));
        }
        if self.ssh.password.is_empty() {
            return Err(ConfigError::MissingField("ssh.password".to_string()));
        }
        if self.ssh.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ssh.command_timeout_secs".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        if self.monitor.continuous_interval_secs == 0 || self.monitor.high_freq_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "monitor".to_string(),
                message: "intervals must be > 0".to_string(),
            });
        }

        // The continuous interval is the heartbeat cadence. A cadence at
        // or past the staleness window makes every restart cycle race a
        // false stale declaration.
        if self.monitor.continuous_interval_secs >= self.watchdog.heartbeat_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "monitor.continuous_interval_secs".to_string(),
                message: format!(
                    "must be < watchdog.heartbeat_timeout_secs ({})",
                    self.watchdog.heartbeat_timeout_secs
                ),
            });
        }

        if self.watchdog.max_stale_probes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watchdog.max_stale_probes".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        if self.email.enabled {
            if self.email.smtp_server.is_empty() {
                return Err(ConfigError::MissingField("email.smtp_server".to_string()));
            }
            if self.email.from.is_empty() || !self.email.from.contains('@') {
                return Err(ConfigError::InvalidValue {
                    field: "email.from".to_string(),
                    message: "must be a mail address".to_string(),
                });
            }
            if self.email.to.is_empty() || self.email.to.iter().any(|a| !a.contains('@')) {
                return Err(ConfigError::InvalidValue {
                    field: "email.to".to_string(),
                    message: "must be a non-empty list of mail addresses".to_string(),
                });
            }
            if self.email.report_times.is_empty() {
                return Err(ConfigError::MissingField("email.report_times".to_string()));
            }
        }

        if self.ai.enabled && self.ai.api_key.is_empty() {
            return Err(ConfigError::MissingField("ai.api_key".to_string()));
        }

        Ok(())
    }

    /// Path of the current daily log file, as written by the file appender.
    pub fn log_file_path(&self, date: chrono::NaiveDate) -> PathBuf {
        self.logging
            .dir
            .join(format!("dbsentinel.{}.log", date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
