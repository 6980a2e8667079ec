//! Client side of the external statistics collector.
//!
//! The collector stores raw hits (`POST /hit`) and answers aggregate
//! queries (`GET /stats`). This service only ever talks to it through the
//! [`StatsClient`] trait so tests can swap in an in-memory collector.

use crate::error::StatsError;
use crate::types::EventId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// URI prefix under which events are exposed publicly.
pub const EVENT_URI_PREFIX: &str = "/events/";

/// Boxed future returned by [`StatsClient`] methods.
pub type StatsFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StatsError>> + Send + 'a>>;

/// Public URI of an event, as recorded in hits.
#[must_use]
pub fn event_uri(id: EventId) -> String {
    format!("{EVENT_URI_PREFIX}{id}")
}

/// Extracts the event id from an event URI.
///
/// Returns `None` for URIs that do not name a single event.
#[must_use]
pub fn parse_event_uri(uri: &str) -> Option<EventId> {
    uri.strip_prefix(EVENT_URI_PREFIX)?.parse().ok()
}

/// A single recorded access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Name of the recording application.
    pub app: String,
    /// Accessed URI.
    pub uri: String,
    /// Client IP.
    pub ip: String,
    /// When the access happened.
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Aggregate query over recorded hits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsQuery {
    /// Window start, inclusive.
    pub start: DateTime<Utc>,
    /// Window end, inclusive.
    pub end: DateTime<Utc>,
    /// URIs to count. Empty means all URIs.
    pub uris: Vec<String>,
    /// Count distinct IPs instead of raw hits.
    pub unique: bool,
}

impl StatsQuery {
    /// Query covering the last hundred years up to `now`.
    #[must_use]
    pub fn all_time(now: DateTime<Utc>, uris: Vec<String>, unique: bool) -> Self {
        Self {
            start: now - Duration::days(365 * 100),
            end: now,
            uris,
            unique,
        }
    }
}

/// One row of a stats response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    /// Application that recorded the hits.
    pub app: String,
    /// URI the hits refer to.
    pub uri: String,
    /// Hit count (or distinct IP count for unique queries).
    pub hits: u64,
}

/// Access to the statistics collector.
///
/// Methods return boxed futures so the trait stays object-safe and can be
/// shared as `Arc<dyn StatsClient>`.
pub trait StatsClient: Send + Sync {
    /// Records a single hit.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError`] if the collector cannot be reached or refuses the hit.
    fn record_hit(&self, hit: Hit) -> StatsFuture<'_, ()>;

    /// Runs an aggregate query.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError`] if the collector cannot be reached or the
    /// response cannot be decoded.
    fn query_counts(&self, query: StatsQuery) -> StatsFuture<'_, Vec<ViewStats>>;
}

/// [`StatsClient`] speaking HTTP/JSON to a remote collector.
#[derive(Clone, Debug)]
pub struct HttpStatsClient {
    base_url: String,
    http: reqwest::Client,
    timeout: std::time::Duration,
}

impl HttpStatsClient {
    /// Creates a client for the collector at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, StatsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatsError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    /// Collector base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, error: &reqwest::Error) -> StatsError {
        if error.is_timeout() {
            StatsError::Timeout(self.timeout)
        } else {
            StatsError::Transport(error.to_string())
        }
    }
}

impl StatsClient for HttpStatsClient {
    fn record_hit(&self, hit: Hit) -> StatsFuture<'_, ()> {
        Box::pin(async move {
            let url = format!("{}/hit", self.base_url);
            let response = self
                .http
                .post(&url)
                .json(&hit)
                .send()
                .await
                .map_err(|e| self.transport_error(&e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(StatsError::Status(status.as_u16()));
            }
            Ok(())
        })
    }

    fn query_counts(&self, query: StatsQuery) -> StatsFuture<'_, Vec<ViewStats>> {
        Box::pin(async move {
            let url = format!("{}/stats", self.base_url);
            let mut params = vec![
                ("start", crate::timestamp::format(&query.start)),
                ("end", crate::timestamp::format(&query.end)),
                ("unique", query.unique.to_string()),
            ];
            params.extend(query.uris.into_iter().map(|uri| ("uris", uri)));

            let response = self
                .http
                .get(&url)
                .query(&params)
                .send()
                .await
                .map_err(|e| self.transport_error(&e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(StatsError::Status(status.as_u16()));
            }
            response
                .json::<Vec<ViewStats>>()
                .await
                .map_err(|e| StatsError::Decode(e.to_string()))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_uri_parses_back() {
        let id = EventId::new();
        assert_eq!(parse_event_uri(&event_uri(id)), Some(id));
        assert_eq!(parse_event_uri("/events"), None);
        assert_eq!(parse_event_uri("/events/not-a-uuid"), None);
    }

    #[test]
    fn test_hit_uses_collector_timestamp_format() {
        let hit = Hit {
            app: "ewm-main-service".to_string(),
            uri: "/events".to_string(),
            ip: "10.0.0.1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["timestamp"], "2025-06-01 08:30:00");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            HttpStatsClient::new("http://stats:9090/", std::time::Duration::from_millis(100)).unwrap();
        assert_eq!(client.base_url(), "http://stats:9090");
    }
}
