
use super::*;

use std::sync::atomic::{AtomicU32, Ordering};

use crate::metrics::MetricKind;

/// Channel that records sends and fails the first `fail_first` attempts.
struct RecordingChannel {
    sent: std::sync::Mutex<Vec<(String, String)>>,
    attempts: AtomicU32,
    fail_first: u32,
}

impl RecordingChannel {
    fn new(fail_first: u32) -> Arc<Self> {
        Arc::new(Self {
            sent: std::sync::Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
            fail_first,
        })
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), MonitorError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(MonitorError::Delivery("simulated failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct CannedAdvisor {
    response: String,
    delay: Duration,
}

#[async_trait]
impl Advisory for CannedAdvisor {
    async fn diagnose(&self, _context: &str) -> Result<String, MonitorError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.response.clone())
    }
}

struct ErroringAdvisor;

#[async_trait]
impl Advisory for ErroringAdvisor {
    async fn diagnose(&self, _context: &str) -> Result<String, MonitorError> {
        Err(MonitorError::Advisory("boom".to_string()))
    }
}

fn email_config(max_retries: u32) -> EmailConfig {
    EmailConfig {
        max_retries,
        retry_delay_secs: 0,
        ..Default::default()
    }
}

fn high_event() -> AlertEvent {
    AlertEvent::new(MetricKind::Cpu, 80.0, 85.0, AlertSeverity::High, "top")
}

fn warning_event() -> AlertEvent {
    AlertEvent::new(MetricKind::Memory, 90.0, 92.0, AlertSeverity::Warning, "free")
}

fn dispatcher(
    channel: Arc<dyn AlertChannel>,
    advisor: Option<Arc<dyn Advisory>>,
    advisor_timeout: Duration,
    max_retries: u32,
) -> (AlertDispatcher, Arc<Mutex<DigestBuffer>>) {
    let digest = Arc::new(Mutex::new(DigestBuffer::default()));
    let (dispatcher, _handle) = AlertDispatcher::new(
        &email_config(max_retries),
        channel,
        advisor,
        advisor_timeout,
        digest.clone(),
    );
    (dispatcher, digest)
}

#[tokio::test]
async fn test_high_event_delivered_immediately() {
    let channel = RecordingChannel::new(0);
    let (dispatcher, digest) = dispatcher(channel.clone(), None, Duration::from_secs(1), 3);

    dispatcher.handle(high_event()).await;

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("HIGH"));
    assert!(digest.lock().await.is_empty());
}

#[tokio::test]
async fn test_warning_event_goes_to_digest() {
    let channel = RecordingChannel::new(0);
    let (dispatcher, digest) = dispatcher(channel.clone(), None, Duration::from_secs(1), 3);

    dispatcher.handle(warning_event()).await;

    assert!(channel.sent().is_empty());
    assert_eq!(digest.lock().await.len(), 1);
}

#[tokio::test]
async fn test_delivery_retries_until_success() {
    let channel = RecordingChannel::new(2);
    let (dispatcher, _) = dispatcher(channel.clone(), None, Duration::from_secs(1), 3);

    dispatcher.handle(high_event()).await;

    assert_eq!(channel.attempts(), 3);
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn test_delivery_gives_up_after_max_attempts() {
    let channel = RecordingChannel::new(u32::MAX);
    let (dispatcher, digest) = dispatcher(channel.clone(), None, Duration::from_secs(1), 2);

    dispatcher.handle(high_event()).await;

    assert_eq!(channel.attempts(), 2);
    assert!(channel.sent().is_empty());
    // The discarded event is not rerouted to the digest.
    assert!(digest.lock().await.is_empty());
}

#[tokio::test]
async fn test_advisory_enrichment_appends_diagnosis() {
    let channel = RecordingChannel::new(0);
    let advisor = Arc::new(CannedAdvisor {
        response: "Add an index on orders.customer_id".to_string(),
        delay: Duration::from_millis(0),
    });
    let (dispatcher, _) = dispatcher(channel.clone(), Some(advisor), Duration::from_secs(1), 3);

    dispatcher.handle(high_event()).await;

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("AI diagnosis"));
    assert!(sent[0].1.contains("Add an index"));
}

#[tokio::test]
async fn test_advisory_timeout_degrades_to_plain_alert() {
    let channel = RecordingChannel::new(0);
    let advisor = Arc::new(CannedAdvisor {
        response: "too late".to_string(),
        delay: Duration::from_secs(5),
    });
    let (dispatcher, _) = dispatcher(
        channel.clone(),
        Some(advisor),
        Duration::from_millis(10),
        3,
    );

    dispatcher.handle(high_event()).await;

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].1.contains("AI diagnosis"));
}

#[tokio::test]
async fn test_advisory_error_degrades_to_plain_alert() {
    let channel = RecordingChannel::new(0);
    let (dispatcher, _) = dispatcher(
        channel.clone(),
        Some(Arc::new(ErroringAdvisor)),
        Duration::from_secs(1),
        3,
    );

    dispatcher.handle(high_event()).await;

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].1.contains("AI diagnosis"));
}

#[tokio::test]
async fn test_run_drains_queue_on_shutdown() {
    let channel = RecordingChannel::new(0);
    let digest = Arc::new(Mutex::new(DigestBuffer::default()));
    let (dispatcher, handle) = AlertDispatcher::new(
        &email_config(3),
        channel.clone(),
        None,
        Duration::from_secs(1),
        digest,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    handle.dispatch(high_event());
    shutdown_tx.send(()).unwrap();

    dispatcher.run(shutdown_rx).await;
    assert_eq!(channel.sent().len(), 1);
}
