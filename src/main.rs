//! dbsentinel - Operational monitor for a remote MySQL host
//!
//! Main entry point for the monitor, watchdog and probe commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dbsentinel_advisor::AdvisorClient;
use dbsentinel_config::{Config, ConfigLoader, LoggingConfig};
use dbsentinel_monitor::{
    Advisory, AlertChannel, AlertDispatcher, DigestBuffer, DigestFlusher, DigestSchedule,
    EmailChannel, LogChannel, MetricsCollector, Monitor, MonitorError,
};
use dbsentinel_remote::SshExecutor;
use dbsentinel_watchdog::{Watchdog, probe_current_minute};

/// dbsentinel CLI.
#[derive(Parser)]
#[command(name = "dbsentinel")]
#[command(about = "Operational monitor and watchdog for a remote MySQL host")]
#[command(version)]
struct Cli {
    /// Configuration file path (optional; environment variables alone
    /// are enough for a container deployment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor process (sampling loops, alerting, heartbeat)
    Run,

    /// Run the watchdog process (log-tail liveness supervision)
    Watchdog,

    /// One-shot liveness probe; exit code 0 iff a heartbeat exists in
    /// the current minute window
    Healthcheck,

    /// Email a report of threshold events extracted from a day's log
    SendReport {
        /// Day to report on, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Send a file's contents to the advisory service and print the
    /// diagnosis
    Diagnose {
        /// File with incident context (log excerpt, report, ...)
        file: PathBuf,
    },
}

/// Bridges the advisory client into the monitor's enrichment trait.
struct AdvisorBridge {
    client: AdvisorClient,
}

#[async_trait::async_trait]
impl Advisory for AdvisorBridge {
    async fn diagnose(&self, context: &str) -> Result<String, MonitorError> {
        self.client
            .diagnose(context)
            .await
            .map_err(|e| MonitorError::Advisory(e.to_string()))
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => ConfigLoader::load_env().context("loading config from environment"),
    }
}

/// Initialize tracing with console and file output.
///
/// The file sink is the liveness contract: the watchdog tails the daily
/// rolling log for heartbeat lines, so writes must stay line-buffered
/// and append-only.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    // The heartbeat target must stay visible whatever level is
    // configured; filtering it out reads as a dead monitor.
    let directives = format!("{},dbsentinel_monitor::heartbeat=info", logging.level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let file_layer = if logging.to_file {
        std::fs::create_dir_all(&logging.dir)?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("dbsentinel")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&logging.dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keep the writer guard alive for the program duration.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    let console_layer = logging
        .to_console
        .then(|| fmt::layer().with_target(true).with_ansi(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}

/// Broadcast a shutdown on SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
        let _ = shutdown.send(());
    });
}

fn delivery_channel(config: &Config) -> Arc<dyn AlertChannel> {
    if config.email.enabled {
        Arc::new(EmailChannel::new(config.email.clone()))
    } else {
        warn!("Email delivery disabled; alerts go to the log only");
        Arc::new(LogChannel)
    }
}

fn advisor(config: &Config) -> anyhow::Result<Option<Arc<dyn Advisory>>> {
    if !config.ai.enabled {
        return Ok(None);
    }
    let client = AdvisorClient::new(&config.ai).context("building advisory client")?;
    info!(model = %config.ai.model, "Advisory enrichment enabled");
    Ok(Some(Arc::new(AdvisorBridge { client })))
}

async fn run_monitor(config: Config) -> anyhow::Result<()> {
    info!(
        host = %config.ssh.host,
        "Monitor starting in continuous tracking mode"
    );

    let (shutdown_tx, _) = broadcast::channel(4);
    spawn_signal_listener(shutdown_tx.clone());

    let executor = Arc::new(SshExecutor::new(config.ssh.clone()));
    let collector = MetricsCollector::new(executor, config.mysql.clone());

    let channel = delivery_channel(&config);
    let digest = Arc::new(tokio::sync::Mutex::new(DigestBuffer::default()));

    let (dispatcher, handle) = AlertDispatcher::new(
        &config.email,
        channel.clone(),
        advisor(&config)?,
        config.ai.timeout(),
        digest.clone(),
    );
    let dispatcher_task = tokio::spawn(dispatcher.run(shutdown_tx.subscribe()));

    let schedule =
        DigestSchedule::from_times(&config.email.report_times).context("digest schedule")?;
    let flusher = DigestFlusher::new(
        digest,
        schedule,
        channel,
        config.email.max_retries,
        config.email.retry_delay(),
    );
    let flusher_task = tokio::spawn(flusher.run(shutdown_tx.subscribe()));

    let monitor = Monitor::new(config.monitor.clone(), collector, handle);
    monitor.run(&shutdown_tx).await;

    // Loops are down; give delivery a bounded grace period to drain.
    let drain = async {
        let _ = dispatcher_task.await;
        let _ = flusher_task.await;
    };
    if tokio::time::timeout(config.monitor.shutdown_grace(), drain)
        .await
        .is_err()
    {
        warn!("Delivery tasks did not drain within the grace period");
    }

    info!("Monitor stopped");
    Ok(())
}

async fn run_watchdog(config: Config) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    spawn_signal_listener(shutdown_tx);

    Watchdog::new(config).run(shutdown_rx).await;
    Ok(())
}

fn run_healthcheck(config: &Config) -> anyhow::Result<bool> {
    let now = chrono::Local::now();
    let log_path = config.log_file_path(now.date_naive());
    Ok(probe_current_minute(&log_path, now)?)
}

/// Pull threshold events for one day back out of the append-only log
/// and mail them as a report.
async fn send_report(config: &Config, date: Option<String>) -> anyhow::Result<()> {
    let date = match date {
        Some(raw) => raw
            .parse::<chrono::NaiveDate>()
            .context("expected YYYY-MM-DD")?,
        None => chrono::Local::now().date_naive(),
    };

    let log_path = config.log_file_path(date);
    let content = std::fs::read_to_string(&log_path)
        .with_context(|| format!("reading {}", log_path.display()))?;

    let events: Vec<&str> = content
        .lines()
        .filter(|l| l.contains("Threshold breached") || l.contains("[ALERT]"))
        .collect();

    let subject = format!("dbsentinel report {} ({} events)", date, events.len());
    let body = if events.is_empty() {
        format!("No threshold events recorded on {}.", date)
    } else {
        events.join("\n")
    };

    let channel = delivery_channel(config);
    channel
        .send(&subject, &body)
        .await
        .map_err(|e| anyhow::anyhow!("sending report: {}", e))?;

    println!("Report for {} sent ({} events)", date, events.len());
    Ok(())
}

async fn diagnose(config: &Config, file: &PathBuf) -> anyhow::Result<()> {
    if !config.ai.enabled {
        anyhow::bail!("AI integration is disabled by configuration");
    }

    let context = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let client = AdvisorClient::new(&config.ai)?;
    let diagnosis = client.diagnose(&context).await?;
    println!("{}", diagnosis);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is honoured when present, as in the deployment template.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Healthcheck => {
            // No tracing init: the probe must not write to the log it reads.
            let healthy = run_healthcheck(&config)?;
            if healthy {
                println!("healthy");
                std::process::exit(0);
            } else {
                println!("stale");
                std::process::exit(1);
            }
        }
        Commands::Run => {
            // Refuse to start partially configured; the watchdog and the
            // probe have no credential requirements and skip this.
            config.validate().context("invalid configuration")?;
            init_tracing(&config.logging)?;
            if let Err(err) = run_monitor(config).await {
                error!(%err, "Monitor failed");
                return Err(err);
            }
        }
        Commands::Watchdog => {
            init_tracing(&LoggingConfig {
                // The watchdog must never write into the monitor's log
                // file; console only.
                to_file: false,
                ..config.logging.clone()
            })?;
            run_watchdog(config).await?;
        }
        Commands::SendReport { date } => {
            config.validate().context("invalid configuration")?;
            init_tracing(&LoggingConfig {
                to_file: false,
                ..config.logging.clone()
            })?;
            send_report(&config, date).await?;
        }
        Commands::Diagnose { file } => {
            config.validate().context("invalid configuration")?;
            diagnose(&config, &file).await?;
        }
    }

    Ok(())
}
