//! Query performance analysis from a processlist table.
//!
//! Parses the `--table` output of a `SHOW PROCESSLIST`-style query and
//! buckets queries by execution time so alert context can say not just
//! "CPU is high" but what the server was doing.

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod tests;

/// Seconds past which a query counts as slow.
const SLOW_QUERY_SECS: i64 = 10;

/// Seconds past which a query counts as critical.
const CRITICAL_QUERY_SECS: i64 = 30;

/// One row of the processlist table.
#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub id: String,
    pub user: String,
    pub db: String,
    pub time_secs: i64,
    pub state: String,
    pub info: String,
}

/// Aggregated execution-time picture of the current processlist.
#[derive(Debug, Clone)]
pub struct QueryPerformance {
    pub total_queries: usize,
    pub max_time_secs: i64,
    pub avg_time_secs: f64,
    pub slow_queries: Vec<QueryEntry>,
    pub critical_queries: Vec<QueryEntry>,
}

impl QueryPerformance {
    /// Plain-text rendering for alert context and digest bodies.
    pub fn format_text(&self) -> String {
        let mut text = format!(
            "Active queries: {} (max {}s, avg {:.1}s)",
            self.total_queries, self.max_time_secs, self.avg_time_secs
        );
        if !self.slow_queries.is_empty() {
            text.push_str(&format!("\nSlow (>{}s):", SLOW_QUERY_SECS));
            for q in &self.slow_queries {
                text.push_str(&format!(
                    "\n  [{}] {}@{} {}s: {}",
                    q.id, q.user, q.db, q.time_secs, q.info
                ));
            }
        }
        if !self.critical_queries.is_empty() {
            text.push_str(&format!(
                "\nCritical (>{}s): {}",
                CRITICAL_QUERY_SECS,
                self.critical_queries.len()
            ));
        }
        text
    }
}

/// Analyze a `mysql --table` processlist dump.
///
/// Returns `None` when the output carries no data rows, so a quiet
/// server simply produces no analysis.
pub fn analyze_processlist(table: &str) -> Option<QueryPerformance> {
    let mut header: Option<Vec<String>> = None;
    let mut entries = Vec::new();

    for line in table.lines() {
        if !line.starts_with('|') {
            continue;
        }
        let cells: Vec<String> = line
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect();

        match header {
            None => header = Some(cells),
            Some(ref head) => {
                if cells.len() != head.len() {
                    continue;
                }
                let field = |name: &str| {
                    head.iter()
                        .position(|h| h == name)
                        .map(|i| cells[i].clone())
                        .unwrap_or_default()
                };
                entries.push(QueryEntry {
                    id: field("ID"),
                    user: field("USER"),
                    db: field("DB"),
                    time_secs: field("TIME").parse().unwrap_or(0),
                    state: field("STATE"),
                    info: field("INFO"),
                });
            }
        }
    }

    if entries.is_empty() {
        return None;
    }

    let max_time_secs = entries.iter().map(|e| e.time_secs).max().unwrap_or(0);
    let avg_time_secs =
        entries.iter().map(|e| e.time_secs).sum::<i64>() as f64 / entries.len() as f64;

    Some(QueryPerformance {
        total_queries: entries.len(),
        max_time_secs,
        avg_time_secs,
        slow_queries: entries
            .iter()
            .filter(|e| e.time_secs > SLOW_QUERY_SECS)
            .cloned()
            .collect(),
        critical_queries: entries
            .iter()
            .filter(|e| e.time_secs > CRITICAL_QUERY_SECS)
            .cloned()
            .collect(),
    })
}
