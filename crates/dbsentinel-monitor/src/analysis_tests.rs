
use super::*;

const PROCESSLIST_TABLE: &str = "\
+----+------+-----------------+------+---------+------+--------------+----------------------------------+
| ID | USER | HOST            | DB   | COMMAND | TIME | STATE        | INFO                             |
+----+------+-----------------+------+---------+------+--------------+----------------------------------+
|  5 | app  | 10.0.0.5:33412  | shop | Query   |   42 | Sending data | SELECT * FROM orders             |
|  7 | app  | 10.0.0.5:33414  | shop | Query   |   12 | Sorting      | SELECT * FROM items ORDER BY id  |
|  9 | etl  | 10.0.0.9:40110  | dwh  | Query   |    2 | executing    | INSERT INTO facts SELECT ...     |
+----+------+-----------------+------+---------+------+--------------+----------------------------------+
";

#[test]
fn test_analyze_processlist_buckets() {
    let perf = analyze_processlist(PROCESSLIST_TABLE).unwrap();
    assert_eq!(perf.total_queries, 3);
    assert_eq!(perf.max_time_secs, 42);
    assert!((perf.avg_time_secs - 18.666).abs() < 0.01);
    assert_eq!(perf.slow_queries.len(), 2);
    assert_eq!(perf.critical_queries.len(), 1);
    assert_eq!(perf.critical_queries[0].id, "5");
}

#[test]
fn test_analyze_processlist_empty_output() {
    assert!(analyze_processlist("").is_none());
}

#[test]
fn test_analyze_processlist_header_only() {
    let table = "\
+----+------+
| ID | USER |
+----+------+
";
    assert!(analyze_processlist(table).is_none());
}

#[test]
fn test_analyze_processlist_unparseable_time_defaults_to_zero() {
    let table = "\
| ID | USER | HOST | DB | COMMAND | TIME | STATE | INFO |
|  1 | app  | h    | d  | Query   | ???  | s     | i    |
";
    let perf = analyze_processlist(table).unwrap();
    assert_eq!(perf.max_time_secs, 0);
    assert!(perf.slow_queries.is_empty());
}

#[test]
fn test_format_text_mentions_slow_queries() {
    let perf = analyze_processlist(PROCESSLIST_TABLE).unwrap();
    let text = perf.format_text();
    assert!(text.contains("Active queries: 3"));
    assert!(text.contains("Slow (>10s):"));
    assert!(text.contains("SELECT * FROM orders"));
    assert!(text.contains("Critical (>30s): 1"));
}
