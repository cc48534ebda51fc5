
use super::*;

use std::io::Write;

use chrono::NaiveDate;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.logging.dir = dir.path().to_path_buf();
    config
}

fn write_log(config: &Config, date: NaiveDate, lines: &[&str]) {
    let path = config.log_file_path(date);
    let mut file = std::fs::File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

#[test]
fn test_scan_reads_todays_log() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let today = Local::now().date_naive();

    write_log(
        &config,
        today,
        &["INFO HEARTBEAT pid=7 ts=2025-06-24 05:00:41"],
    );

    let watchdog = Watchdog::new(config);
    let found = watchdog.scan_last_heartbeat().unwrap();
    assert_eq!(found.time().to_string(), "05:00:41");
}

#[test]
fn test_scan_falls_back_to_yesterday() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let yesterday = Local::now().date_naive().pred_opt().unwrap();

    write_log(
        &config,
        yesterday,
        &["INFO HEARTBEAT pid=7 ts=2025-06-23 23:59:41"],
    );

    let watchdog = Watchdog::new(config);
    assert!(watchdog.scan_last_heartbeat().is_some());
}

#[test]
fn test_scan_with_no_logs() {
    let dir = TempDir::new().unwrap();
    let watchdog = Watchdog::new(config_in(&dir));
    assert!(watchdog.scan_last_heartbeat().is_none());
}

#[test]
fn test_scan_prefers_today_over_yesterday() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let today = Local::now().date_naive();
    let yesterday = today.pred_opt().unwrap();

    write_log(
        &config,
        yesterday,
        &["INFO HEARTBEAT pid=7 ts=2025-06-23 10:00:00"],
    );
    write_log(
        &config,
        today,
        &["INFO HEARTBEAT pid=7 ts=2025-06-24 11:00:00"],
    );

    let watchdog = Watchdog::new(config);
    let found = watchdog.scan_last_heartbeat().unwrap();
    assert_eq!(found.date().to_string(), "2025-06-24");
}
