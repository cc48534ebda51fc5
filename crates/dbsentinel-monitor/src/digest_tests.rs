
use super::*;

use async_trait::async_trait;
use chrono::TimeZone;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::alerts::AlertSeverity;
use crate::metrics::MetricKind;

fn times(spec: &[&str]) -> Vec<ReportTime> {
    spec.iter().map(|s| s.parse().unwrap()).collect()
}

fn warning_event(observed: f64) -> AlertEvent {
    AlertEvent::new(
        MetricKind::Memory,
        90.0,
        observed,
        AlertSeverity::Warning,
        "free",
    )
}

#[test]
fn test_schedule_next_fire_same_day() {
    let schedule = DigestSchedule::from_times(&times(&["09:00", "23:59"])).unwrap();
    let at = Local.with_ymd_and_hms(2025, 6, 24, 8, 0, 0).unwrap();
    let next = schedule.next_fire_after(at).unwrap();
    assert_eq!(
        next,
        Local.with_ymd_and_hms(2025, 6, 24, 9, 0, 0).unwrap()
    );
}

#[test]
fn test_schedule_next_fire_picks_later_instant() {
    let schedule = DigestSchedule::from_times(&times(&["09:00", "23:59"])).unwrap();
    let at = Local.with_ymd_and_hms(2025, 6, 24, 10, 0, 0).unwrap();
    let next = schedule.next_fire_after(at).unwrap();
    assert_eq!(
        next,
        Local.with_ymd_and_hms(2025, 6, 24, 23, 59, 0).unwrap()
    );
}

#[test]
fn test_schedule_wraps_to_next_day() {
    let schedule = DigestSchedule::from_times(&times(&["09:00", "23:59"])).unwrap();
    let at = Local.with_ymd_and_hms(2025, 6, 24, 23, 59, 30).unwrap();
    let next = schedule.next_fire_after(at).unwrap();
    assert_eq!(
        next,
        Local.with_ymd_and_hms(2025, 6, 25, 9, 0, 0).unwrap()
    );
}

#[test]
fn test_exactly_two_fires_per_day() {
    let schedule = DigestSchedule::from_times(&times(&["09:00", "23:59"])).unwrap();
    let start = Local.with_ymd_and_hms(2025, 6, 24, 0, 0, 0).unwrap();
    let end = start + chrono::Duration::hours(24);

    let mut fires = Vec::new();
    let mut cursor = start;
    while let Some(next) = schedule.next_fire_after(cursor) {
        if next >= end {
            break;
        }
        fires.push(next);
        cursor = next;
    }

    assert_eq!(fires.len(), 2);
}

#[test]
fn test_empty_schedule_has_no_fire() {
    let schedule = DigestSchedule::from_times(&[]).unwrap();
    assert!(schedule.next_fire_after(Local::now()).is_none());
}

#[test]
fn test_render_digest() {
    let events = vec![warning_event(92.0), warning_event(93.5)];
    let date = Local.with_ymd_and_hms(2025, 6, 24, 9, 0, 0).unwrap();
    let (subject, body) = render_digest(&events, date);

    assert_eq!(subject, "dbsentinel digest 2025-06-24 (2 events)");
    assert!(body.contains("92.0%"));
    assert!(body.contains("93.5%"));
    assert!(body.contains("---"));
}

#[test]
fn test_render_digest_singular_subject() {
    let events = vec![warning_event(92.0)];
    let date = Local.with_ymd_and_hms(2025, 6, 24, 9, 0, 0).unwrap();
    let (subject, _) = render_digest(&events, date);
    assert!(subject.ends_with("(1 event)"));
}

#[test]
fn test_buffer_drain_and_restore_order() {
    let mut buffer = DigestBuffer::default();
    buffer.push(warning_event(91.0));
    let batch = buffer.drain();
    assert!(buffer.is_empty());

    buffer.push(warning_event(95.0));
    buffer.restore(batch);
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.deferrals(), 1);

    // Restored batch sits in front of newer events.
    let drained = buffer.drain();
    assert_eq!(drained[0].observed, 91.0);
    assert_eq!(drained[1].observed, 95.0);
}

struct FlakyChannel {
    attempts: AtomicU32,
    fail: bool,
}

#[async_trait]
impl AlertChannel for FlakyChannel {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn send(&self, _subject: &str, _body: &str) -> Result<(), MonitorError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(MonitorError::Delivery("smtp down".to_string()))
        } else {
            Ok(())
        }
    }
}

fn flusher(buffer: Arc<Mutex<DigestBuffer>>, fail: bool) -> (DigestFlusher, Arc<FlakyChannel>) {
    let channel = Arc::new(FlakyChannel {
        attempts: AtomicU32::new(0),
        fail,
    });
    let flusher = DigestFlusher::new(
        buffer,
        DigestSchedule::from_times(&[]).unwrap(),
        channel.clone(),
        1,
        Duration::from_secs(0),
    );
    (flusher, channel)
}

#[tokio::test]
async fn test_flush_now_sends_and_clears() {
    let buffer = Arc::new(Mutex::new(DigestBuffer::default()));
    buffer.lock().await.push(warning_event(92.0));

    let (flusher, channel) = flusher(buffer.clone(), false);
    flusher.flush_now().await;

    assert_eq!(channel.attempts.load(Ordering::SeqCst), 1);
    assert!(buffer.lock().await.is_empty());
}

#[tokio::test]
async fn test_flush_now_skips_empty_buffer() {
    let buffer = Arc::new(Mutex::new(DigestBuffer::default()));
    let (flusher, channel) = flusher(buffer.clone(), false);
    flusher.flush_now().await;
    assert_eq!(channel.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_flush_failure_defers_once_then_discards() {
    let buffer = Arc::new(Mutex::new(DigestBuffer::default()));
    buffer.lock().await.push(warning_event(92.0));

    let (flusher, _) = flusher(buffer.clone(), true);

    // First failure: the batch is deferred whole.
    flusher.flush_now().await;
    {
        let locked = buffer.lock().await;
        assert_eq!(locked.len(), 1);
        assert_eq!(locked.deferrals(), 1);
    }

    // Second failure: the batch is discarded.
    flusher.flush_now().await;
    {
        let locked = buffer.lock().await;
        assert!(locked.is_empty());
        assert_eq!(locked.deferrals(), 0);
    }
}
