//! Alert dispatch.
//!
//! Sampling loops never deliver anything themselves; they hand events to
//! a [`DispatcherHandle`] and move on. The dispatcher task routes High
//! severity events to immediate delivery (with optional advisory
//! enrichment) and everything else into the digest buffer.

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use dbsentinel_config::EmailConfig;

use crate::alerts::{AlertChannel, AlertEvent, AlertSeverity};
use crate::digest::DigestBuffer;
use crate::error::MonitorError;

/// Queue depth between the sampling loops and the dispatcher.
const DISPATCH_QUEUE_DEPTH: usize = 64;

/// Capability to ask the advisory service for an incident diagnosis.
#[async_trait]
pub trait Advisory: Send + Sync {
    async fn diagnose(&self, context: &str) -> Result<String, MonitorError>;
}

/// Cloneable producer side of the dispatch queue.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<AlertEvent>,
}

impl DispatcherHandle {
    /// Queue an event for delivery. Never blocks the sampling path; a
    /// full or closed queue drops the event with a log record.
    pub fn dispatch(&self, event: AlertEvent) {
        if let Err(err) = self.tx.try_send(event) {
            error!(%err, "Dispatch queue rejected alert event");
        }
    }

    /// Bare handle plus the receiving end, for tests that inspect what
    /// the sampling loops dispatch.
    #[cfg(test)]
    pub(crate) fn test_channel() -> (DispatcherHandle, mpsc::Receiver<AlertEvent>) {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE_DEPTH);
        (DispatcherHandle { tx }, rx)
    }
}

/// Consumes alert events and drives delivery.
pub struct AlertDispatcher {
    rx: mpsc::Receiver<AlertEvent>,
    channel: Arc<dyn AlertChannel>,
    advisor: Option<Arc<dyn Advisory>>,
    advisor_timeout: Duration,
    max_attempts: u32,
    retry_delay: Duration,
    digest: Arc<Mutex<DigestBuffer>>,
}

impl AlertDispatcher {
    /// Create a dispatcher and its producer handle.
    pub fn new(
        email: &EmailConfig,
        channel: Arc<dyn AlertChannel>,
        advisor: Option<Arc<dyn Advisory>>,
        advisor_timeout: Duration,
        digest: Arc<Mutex<DigestBuffer>>,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE_DEPTH);
        (
            Self {
                rx,
                channel,
                advisor,
                advisor_timeout,
                max_attempts: email.max_retries.max(1),
                retry_delay: email.retry_delay(),
                digest,
            },
            DispatcherHandle { tx },
        )
    }

    /// Run until shutdown. Remaining queued events are processed before
    /// the task exits so a breach observed just before shutdown still
    /// gets its delivery attempt.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(channel = self.channel.name(), "Alert dispatcher started");
        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }

        self.rx.close();
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event).await;
        }
        info!("Alert dispatcher stopped");
    }

    pub(crate) async fn handle(&self, event: AlertEvent) {
        match event.severity {
            AlertSeverity::High => self.deliver_immediate(event).await,
            _ => {
                debug!(subject = %event.subject(), "Buffering event for digest");
                self.digest.lock().await.push(event);
            }
        }
    }

    async fn deliver_immediate(&self, mut event: AlertEvent) {
        if let Some(ref advisor) = self.advisor {
            event.diagnosis = self.enrich(advisor.as_ref(), &event).await;
        }

        let subject = event.subject();
        let delivered = send_with_retry(
            self.channel.as_ref(),
            self.max_attempts,
            self.retry_delay,
            &subject,
            &event.format_text(),
        )
        .await;

        if !delivered {
            error!(%subject, "Alert discarded after exhausting delivery attempts");
        }
    }

    /// Best-effort advisory call. A timeout or error degrades to `None`;
    /// delivery proceeds either way.
    async fn enrich(&self, advisor: &dyn Advisory, event: &AlertEvent) -> Option<String> {
        match timeout(self.advisor_timeout, advisor.diagnose(&event.format_text())).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(err)) => {
                warn!(%err, "Advisory request failed; sending alert without diagnosis");
                None
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.advisor_timeout.as_secs(),
                    "Advisory request timed out; sending alert without diagnosis"
                );
                None
            }
        }
    }
}

/// Attempt delivery with linear backoff. Returns whether a send
/// succeeded; the failure itself is always logged, never silent.
pub(crate) async fn send_with_retry(
    channel: &dyn AlertChannel,
    max_attempts: u32,
    retry_delay: Duration,
    subject: &str,
    body: &str,
) -> bool {
    for attempt in 1..=max_attempts {
        match channel.send(subject, body).await {
            Ok(()) => return true,
            Err(err) => {
                warn!(
                    channel = channel.name(),
                    subject, attempt, max_attempts, %err,
                    "Delivery attempt failed"
                );
                if attempt < max_attempts {
                    sleep(retry_delay * attempt).await;
                }
            }
        }
    }
    false
}
