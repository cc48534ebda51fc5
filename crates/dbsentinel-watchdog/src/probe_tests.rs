
use super::*;

use std::io::Write;

use chrono::TimeZone;
use tempfile::NamedTempFile;

fn probe_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 24, 5, 0, 30).unwrap()
}

#[test]
fn test_probe_finds_current_minute_heartbeat() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "INFO HEARTBEAT pid=7 ts=2025-06-24 05:00:12").unwrap();

    assert!(probe_current_minute(file.path(), probe_time()).unwrap());
}

#[test]
fn test_probe_rejects_previous_minute() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "INFO HEARTBEAT pid=7 ts=2025-06-24 04:59:59").unwrap();

    assert!(!probe_current_minute(file.path(), probe_time()).unwrap());
}

#[test]
fn test_probe_rejects_same_minute_of_other_day() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "INFO HEARTBEAT pid=7 ts=2025-06-23 05:00:12").unwrap();

    assert!(!probe_current_minute(file.path(), probe_time()).unwrap());
}

#[test]
fn test_probe_requires_marker() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "INFO startup ts=2025-06-24 05:00:12").unwrap();

    assert!(!probe_current_minute(file.path(), probe_time()).unwrap());
}

#[test]
fn test_probe_missing_file_is_unhealthy() {
    let path = Path::new("/nonexistent/dbsentinel.log");
    assert!(!probe_current_minute(path, probe_time()).unwrap());
}

#[test]
fn test_probe_idempotent_within_minute() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "INFO HEARTBEAT pid=7 ts=2025-06-24 05:00:12").unwrap();

    let first = probe_current_minute(file.path(), probe_time()).unwrap();
    let second = probe_current_minute(file.path(), probe_time()).unwrap();
    assert_eq!(first, second);
}
