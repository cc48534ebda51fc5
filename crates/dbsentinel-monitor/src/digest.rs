//! Scheduled digest delivery.
//!
//! Lower-severity events accumulate in a buffer and are flushed as one
//! email at each configured daily instant. A batch is sent whole or not
//! at all: a failed flush defers the batch to the next cycle once, then
//! discards it after logging.

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::sync::{Mutex, broadcast};
use tokio::time::sleep;
use tracing::{debug, error, info};

use dbsentinel_config::ReportTime;

use crate::alerts::{AlertChannel, AlertEvent};
use crate::dispatch::send_with_retry;
use crate::error::MonitorError;

/// Accumulated events awaiting the next digest flush.
#[derive(Default)]
pub struct DigestBuffer {
    events: Vec<AlertEvent>,
    deferrals: u32,
}

impl DigestBuffer {
    pub fn push(&mut self, event: AlertEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take the whole batch out for a flush attempt.
    pub fn drain(&mut self) -> Vec<AlertEvent> {
        std::mem::take(&mut self.events)
    }

    /// Put a failed batch back, in front of anything buffered meanwhile.
    pub fn restore(&mut self, mut batch: Vec<AlertEvent>) {
        batch.append(&mut self.events);
        self.events = batch;
        self.deferrals += 1;
    }

    pub fn deferrals(&self) -> u32 {
        self.deferrals
    }

    pub fn reset_deferrals(&mut self) {
        self.deferrals = 0;
    }
}

/// Daily flush instants backed by cron schedules.
pub struct DigestSchedule {
    schedules: Vec<Schedule>,
}

impl DigestSchedule {
    /// Build from configured HH:MM instants.
    pub fn from_times(times: &[ReportTime]) -> Result<Self, MonitorError> {
        let schedules = times
            .iter()
            .map(|t| {
                Schedule::from_str(&t.to_cron_expr())
                    .map_err(|e| MonitorError::Schedule(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { schedules })
    }

    /// Earliest instant strictly after `after`, across all schedules.
    pub fn next_fire_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedules
            .iter()
            .filter_map(|s| s.after(&after).next())
            .min()
    }
}

/// Render a digest batch as (subject, body).
pub fn render_digest(events: &[AlertEvent], date: DateTime<Local>) -> (String, String) {
    let subject = format!(
        "dbsentinel digest {} ({} event{})",
        date.format("%Y-%m-%d"),
        events.len(),
        if events.len() == 1 { "" } else { "s" }
    );

    let mut body = format!(
        "Accumulated threshold events up to {}:\n",
        date.format("%Y-%m-%d %H:%M")
    );
    for event in events {
        body.push_str("\n");
        body.push_str(&event.format_text());
        body.push_str("\n---\n");
    }

    (subject, body)
}

/// Flushes the digest buffer at each scheduled instant.
pub struct DigestFlusher {
    buffer: Arc<Mutex<DigestBuffer>>,
    schedule: DigestSchedule,
    channel: Arc<dyn AlertChannel>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DigestFlusher {
    pub fn new(
        buffer: Arc<Mutex<DigestBuffer>>,
        schedule: DigestSchedule,
        channel: Arc<dyn AlertChannel>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            buffer,
            schedule,
            channel,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Run until shutdown. On shutdown any buffered events stay in the
    /// buffer untouched; there is no partial delivery.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let Some(next) = self.schedule.next_fire_after(Local::now()) else {
                info!("No digest instants configured; flusher idle");
                return;
            };
            let wait = (next - Local::now())
                .to_std()
                .unwrap_or(Duration::from_secs(0));
            debug!(at = %next, "Next digest flush scheduled");

            tokio::select! {
                _ = sleep(wait) => self.flush_now().await,
                _ = shutdown.recv() => {
                    info!("Digest flusher shutting down; buffered events deferred");
                    return;
                }
            }
        }
    }

    /// One flush attempt over the current buffer contents.
    pub async fn flush_now(&self) {
        let batch = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                debug!("Digest flush due but buffer is empty");
                return;
            }
            buffer.drain()
        };

        let (subject, body) = render_digest(&batch, Local::now());
        info!(%subject, events = batch.len(), "Flushing digest");

        let sent = send_with_retry(
            self.channel.as_ref(),
            self.max_attempts,
            self.retry_delay,
            &subject,
            &body,
        )
        .await;

        let mut buffer = self.buffer.lock().await;
        if sent {
            buffer.reset_deferrals();
        } else if buffer.deferrals() == 0 {
            error!(events = batch.len(), "Digest flush failed; deferring batch to next cycle");
            buffer.restore(batch);
        } else {
            error!(events = batch.len(), "Digest flush failed twice; discarding batch");
            buffer.reset_deferrals();
        }
    }
}
