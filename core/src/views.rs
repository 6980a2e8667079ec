//! View counts: recording hits and decorating events with current counts.
//!
//! Reads never fail because the collector is slow or down. Query errors
//! and timeouts are logged and the cached `views` value is kept. Hits are
//! handed to a background task through a bounded channel so recording
//! never blocks a response.

use crate::environment::Clock;
use crate::stats::{event_uri, parse_event_uri, Hit, StatsClient, StatsQuery};
use crate::types::{ClientContext, Event, EventId, SortKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Settings for view aggregation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewConfig {
    /// `app` field of recorded hits.
    pub app_name: String,
    /// Upper bound on a stats query.
    pub query_timeout: Duration,
    /// Capacity of the hit buffer.
    pub hit_buffer: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            app_name: "ewm-main-service".to_string(),
            query_timeout: Duration::from_millis(500),
            hit_buffer: 1024,
        }
    }
}

/// Fire-and-forget hit submission.
///
/// Hits go into a bounded channel drained by a spawned task. When the
/// buffer is full the hit is dropped and counted.
#[derive(Clone, Debug)]
pub struct HitReporter {
    sender: mpsc::Sender<Hit>,
}

impl HitReporter {
    /// Spawns the drain task and returns a handle to it.
    ///
    /// The task ends once every `HitReporter` clone has been dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(client: Arc<dyn StatsClient>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<Hit>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(hit) = receiver.recv().await {
                if let Err(error) = client.record_hit(hit).await {
                    metrics::counter!("ewm.stats.failures").increment(1);
                    tracing::warn!(error = %error, "Failed to record hit");
                }
            }
            tracing::debug!("Hit reporter stopped");
        });

        (Self { sender }, handle)
    }

    /// Queues a hit without waiting.
    pub fn report(&self, hit: Hit) {
        match self.sender.try_send(hit) {
            Ok(()) => {},
            Err(TrySendError::Full(hit)) => {
                metrics::counter!("ewm.stats.hits_dropped").increment(1);
                tracing::warn!(uri = %hit.uri, "Hit buffer full, dropping hit");
            },
            Err(TrySendError::Closed(hit)) => {
                metrics::counter!("ewm.stats.hits_dropped").increment(1);
                tracing::warn!(uri = %hit.uri, "Hit reporter stopped, dropping hit");
            },
        }
    }
}

/// Decorates events with view counts and records public accesses.
#[derive(Clone)]
pub struct ViewAggregator {
    client: Arc<dyn StatsClient>,
    reporter: HitReporter,
    clock: Arc<dyn Clock>,
    config: ViewConfig,
}

impl ViewAggregator {
    /// Creates an aggregator and spawns its hit reporter.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(client: Arc<dyn StatsClient>, clock: Arc<dyn Clock>, config: ViewConfig) -> Self {
        let (reporter, _drain) = HitReporter::spawn(Arc::clone(&client), config.hit_buffer);
        Self {
            client,
            reporter,
            clock,
            config,
        }
    }

    /// Queues a hit for `context` without waiting on the collector.
    pub fn record_view(&self, context: &ClientContext) {
        self.reporter.report(Hit {
            app: self.config.app_name.clone(),
            uri: context.endpoint.clone(),
            ip: context.ip.clone(),
            timestamp: self.clock.now(),
        });
    }

    /// Replaces `views` on each event with the collector's total hit count.
    ///
    /// Events missing from the response, or all events when the query
    /// fails, keep their cached value. Returns whether the collector answered.
    pub async fn decorate(&self, events: &mut [Event]) -> bool {
        if events.is_empty() {
            return false;
        }
        let uris = events.iter().map(|e| event_uri(e.id)).collect();
        let query = StatsQuery::all_time(self.clock.now(), uris, false);

        let Some(rows) = self.query(query).await else {
            return false;
        };
        let counts: HashMap<EventId, u64> = rows
            .into_iter()
            .filter_map(|row| parse_event_uri(&row.uri).map(|id| (id, row.hits)))
            .collect();

        for event in events.iter_mut() {
            if let Some(hits) = counts.get(&event.id) {
                event.views = *hits;
            }
        }
        true
    }

    /// Replaces `views` on a single event with its distinct-IP count.
    ///
    /// Returns whether the collector answered.
    pub async fn decorate_single(&self, event: &mut Event) -> bool {
        let uri = event_uri(event.id);
        let query = StatsQuery::all_time(self.clock.now(), vec![uri.clone()], true);

        let Some(rows) = self.query(query).await else {
            return false;
        };
        if let Some(row) = rows.into_iter().find(|row| row.uri == uri) {
            event.views = row.hits;
        }
        true
    }

    /// Sorts in place, descending by the key. `None` keeps the order.
    pub fn apply_sort(events: &mut [Event], sort: Option<SortKey>) {
        match sort {
            Some(SortKey::EventDate) => events.sort_by(|a, b| b.event_date.cmp(&a.event_date)),
            Some(SortKey::Views) => events.sort_by(|a, b| b.views.cmp(&a.views)),
            None => {},
        }
    }

    async fn query(&self, query: StatsQuery) -> Option<Vec<crate::stats::ViewStats>> {
        match tokio::time::timeout(self.config.query_timeout, self.client.query_counts(query)).await {
            Ok(Ok(rows)) => Some(rows),
            Ok(Err(error)) => {
                metrics::counter!("ewm.stats.failures").increment(1);
                tracing::warn!(error = %error, "Stats query failed, keeping cached views");
                None
            },
            Err(_) => {
                metrics::counter!("ewm.stats.failures").increment(1);
                tracing::warn!(
                    timeout_ms = u64::try_from(self.config.query_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Stats query timed out, keeping cached views"
                );
                None
            },
        }
    }
}

impl std::fmt::Debug for ViewAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
