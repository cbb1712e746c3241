// Telemetry - request counters and a short log of recent SQL
//
// Both are process-wide and shared between handlers, so each keeps its own
// mutex. A poisoned lock is recovered rather than propagated: the data is
// plain counters and strings and stays consistent.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Default number of queries `QueryLog` keeps
pub const DEFAULT_QUERY_LOG_CAPACITY: usize = 10;

/// controller -> action -> count
pub type MethodCallStats = BTreeMap<String, BTreeMap<String, u64>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// REQUEST TELEMETRY
// ============================================================================

#[derive(Debug, Default)]
pub struct RequestTelemetry {
    calls: Mutex<MethodCallStats>,
}

impl RequestTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, controller: &str, action: &str) {
        let mut calls = lock(&self.calls);
        *calls
            .entry(controller.to_string())
            .or_default()
            .entry(action.to_string())
            .or_insert(0) += 1;
    }

    /// Snapshot copy of the counters
    pub fn stats(&self) -> MethodCallStats {
        lock(&self.calls).clone()
    }
}

// ============================================================================
// QUERY LOG
// ============================================================================

/// Most recent queries, newest first, bounded by `capacity`.
#[derive(Debug)]
pub struct QueryLog {
    capacity: usize,
    entries: Mutex<VecDeque<String>>,
}

impl QueryLog {
    pub fn new(capacity: usize) -> Self {
        QueryLog {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, sql: &str, elapsed: Duration) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = lock(&self.entries);
        entries.push_front(format!("{} ({}ms)", compact_sql(sql), elapsed.as_millis()));
        entries.truncate(self.capacity);
    }

    pub fn recent(&self) -> Vec<String> {
        lock(&self.entries).iter().cloned().collect()
    }
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_LOG_CAPACITY)
    }
}

/// Collapse the whitespace of a multi-line statement onto one line.
fn compact_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_per_controller_and_action() {
        let telemetry = RequestTelemetry::new();

        telemetry.record("Makes", "GET /Makes/:id");
        telemetry.record("Makes", "GET /Makes/:id");
        telemetry.record("Makes", "POST /Makes");
        telemetry.record("Cars", "GET /Cars");

        let stats = telemetry.stats();
        assert_eq!(stats["Makes"]["GET /Makes/:id"], 2);
        assert_eq!(stats["Makes"]["POST /Makes"], 1);
        assert_eq!(stats["Cars"]["GET /Cars"], 1);
        assert!(!stats.contains_key("Models"));
    }

    #[test]
    fn test_stats_is_a_snapshot() {
        let telemetry = RequestTelemetry::new();
        telemetry.record("Makes", "GET /Makes");

        let before = telemetry.stats();
        telemetry.record("Makes", "GET /Makes");

        assert_eq!(before["Makes"]["GET /Makes"], 1);
        assert_eq!(telemetry.stats()["Makes"]["GET /Makes"], 2);
    }

    #[test]
    fn test_query_log_keeps_newest_first() {
        let log = QueryLog::new(3);

        for n in 0..5 {
            log.push(&format!("SELECT {}", n), Duration::from_millis(n));
        }

        assert_eq!(
            log.recent(),
            vec!["SELECT 4 (4ms)", "SELECT 3 (3ms)", "SELECT 2 (2ms)"]
        );
    }

    #[test]
    fn test_query_log_compacts_whitespace() {
        let log = QueryLog::default();

        log.push("SELECT id\n         FROM makes", Duration::ZERO);

        assert_eq!(log.capacity(), DEFAULT_QUERY_LOG_CAPACITY);
        assert_eq!(log.recent(), vec!["SELECT id FROM makes (0ms)"]);
    }

    #[test]
    fn test_zero_capacity_logs_nothing() {
        let log = QueryLog::new(0);
        log.push("SELECT 1", Duration::ZERO);
        assert!(log.recent().is_empty());
    }
}
