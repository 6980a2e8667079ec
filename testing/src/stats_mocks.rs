//! In-memory and misbehaving stats collectors for tests.

use ewm_core::error::StatsError;
use ewm_core::stats::{Hit, StatsClient, StatsFuture, StatsQuery, ViewStats};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Collector that keeps hits in memory and answers queries from them.
///
/// Clones share storage, so a test can keep one handle and hand another
/// to the service under test.
///
/// # Example
///
/// ```ignore
/// let stats = InMemoryStatsCollector::new();
/// stats.seed("/events/0b9c...", "10.0.0.1", 3);
/// let service = fixtures::service(Arc::new(stats.clone()));
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStatsCollector {
    hits: Arc<Mutex<Vec<Hit>>>,
    queries: Arc<Mutex<Vec<StatsQuery>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStatsCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `count` hits for `uri` from `ip`, timestamped a day before the test clock.
    pub fn seed(&self, uri: &str, ip: &str, count: usize) {
        let timestamp = crate::test_clock_time() - chrono::Duration::days(1);
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..count {
            hits.push(Hit {
                app: "ewm-main-service".to_string(),
                uri: uri.to_string(),
                ip: ip.to_string(),
                timestamp,
            });
        }
    }

    /// While set, every count query fails as if the collector were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All recorded hits, oldest first.
    #[must_use]
    pub fn hits(&self) -> Vec<Hit> {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All queries received, oldest first.
    #[must_use]
    pub fn queries(&self) -> Vec<StatsQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits until at least `count` hits are stored or `timeout` elapses.
    ///
    /// Returns whether the count was reached.
    pub async fn wait_for_hits(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.hits.lock().unwrap_or_else(PoisonError::into_inner).len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn answer(&self, query: &StatsQuery) -> Vec<ViewStats> {
        let hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        let mut by_uri: BTreeMap<&str, (u64, HashSet<&str>)> = BTreeMap::new();
        for hit in hits.iter().filter(|hit| {
            hit.timestamp >= query.start
                && hit.timestamp <= query.end
                && (query.uris.is_empty() || query.uris.contains(&hit.uri))
        }) {
            let entry = by_uri.entry(hit.uri.as_str()).or_default();
            entry.0 += 1;
            entry.1.insert(hit.ip.as_str());
        }

        let mut rows: Vec<ViewStats> = by_uri
            .into_iter()
            .map(|(uri, (total, ips))| ViewStats {
                app: "ewm-main-service".to_string(),
                uri: uri.to_string(),
                hits: if query.unique { ips.len() as u64 } else { total },
            })
            .collect();
        rows.sort_by(|a, b| b.hits.cmp(&a.hits));
        rows
    }
}

impl StatsClient for InMemoryStatsCollector {
    fn record_hit(&self, hit: Hit) -> StatsFuture<'_, ()> {
        Box::pin(async move {
            self.hits
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(hit);
            Ok(())
        })
    }

    fn query_counts(&self, query: StatsQuery) -> StatsFuture<'_, Vec<ViewStats>> {
        Box::pin(async move {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StatsError::Transport("connection refused".to_string()));
            }
            let rows = self.answer(&query);
            self.queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(query);
            Ok(rows)
        })
    }
}

/// Collector that fails every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingStatsCollector;

impl StatsClient for FailingStatsCollector {
    fn record_hit(&self, _hit: Hit) -> StatsFuture<'_, ()> {
        Box::pin(async { Err(StatsError::Status(503)) })
    }

    fn query_counts(&self, _query: StatsQuery) -> StatsFuture<'_, Vec<ViewStats>> {
        Box::pin(async { Err(StatsError::Transport("connection refused".to_string())) })
    }
}

/// Collector that answers correctly but only after `delay`.
#[derive(Clone, Debug)]
pub struct SlowStatsCollector {
    inner: InMemoryStatsCollector,
    delay: Duration,
}

impl SlowStatsCollector {
    /// Wraps `inner`, delaying every call by `delay`.
    #[must_use]
    pub const fn new(inner: InMemoryStatsCollector, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl StatsClient for SlowStatsCollector {
    fn record_hit(&self, hit: Hit) -> StatsFuture<'_, ()> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.record_hit(hit).await
        })
    }

    fn query_counts(&self, query: StatsQuery) -> StatsFuture<'_, Vec<ViewStats>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.query_counts(query).await
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ewm_core::stats::StatsQuery;

    #[tokio::test]
    async fn test_unique_counts_distinct_ips() {
        let stats = InMemoryStatsCollector::new();
        stats.seed("/events/a", "10.0.0.1", 3);
        stats.seed("/events/a", "10.0.0.2", 1);
        stats.seed("/events/b", "10.0.0.1", 1);

        let now = crate::test_clock_time();
        let total = stats
            .query_counts(StatsQuery::all_time(now, vec!["/events/a".to_string()], false))
            .await
            .unwrap();
        let unique = stats
            .query_counts(StatsQuery::all_time(now, vec!["/events/a".to_string()], true))
            .await
            .unwrap();

        assert_eq!(total.len(), 1);
        assert_eq!(total[0].hits, 4);
        assert_eq!(unique[0].hits, 2);
        assert_eq!(stats.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_collector_fails() {
        let result = FailingStatsCollector
            .query_counts(StatsQuery::all_time(crate::test_clock_time(), Vec::new(), false))
            .await;
        assert!(matches!(result, Err(StatsError::Transport(_))));
    }
}
