//! # EWM Testing
//!
//! Test doubles and helpers for the EWM crates.
//!
//! This crate provides:
//! - `FixedClock` and `test_clock()` for deterministic time
//! - In-memory, failing and slow stats collectors
//! - Fixtures that build valid drafts and wired-up services
//! - `ReducerTest`, a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use ewm_testing::{fixtures, InMemoryStatsCollector};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_publish_flow() {
//!     let service = fixtures::service(Arc::new(InMemoryStatsCollector::new()));
//!     let event = fixtures::published_event(&service, UserId::new(), 10, true).await;
//!     assert_eq!(event.state, EventState::Published);
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use ewm_core::environment::Clock;

pub mod stats_mocks;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ewm_testing::mocks::FixedClock;
    /// use ewm_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a fixed clock at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(super::test_clock_time())
    }
}

/// The instant returned by [`test_clock`].
#[must_use]
pub fn test_clock_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Builders for common test scenarios.
pub mod fixtures {
    use crate::mocks::test_clock;
    use chrono::{DateTime, Duration, Utc};
    use ewm_core::environment::{DomainEnvironment, LeadTimes};
    use ewm_core::ledger::Registry;
    use ewm_core::service::EventService;
    use ewm_core::stats::StatsClient;
    use ewm_core::types::{AdminAction, AdminUpdate, CategoryId, Event, Location, NewEvent, UserId};
    use ewm_core::views::{ViewAggregator, ViewConfig};
    use std::sync::Arc;

    /// Environment with the test clock and default lead times.
    #[must_use]
    pub fn environment() -> DomainEnvironment {
        DomainEnvironment::new(Arc::new(test_clock()), LeadTimes::default())
    }

    /// A valid draft taking place `days` after the test clock.
    #[must_use]
    pub fn draft(days: i64) -> NewEvent {
        draft_at(super::test_clock_time() + Duration::days(days))
    }

    /// A valid draft taking place at `event_date`.
    #[must_use]
    pub fn draft_at(event_date: DateTime<Utc>) -> NewEvent {
        NewEvent {
            title: "Rust Belt Meetup".to_string(),
            annotation: "An evening of talks about async Rust in production".to_string(),
            description: "Three short talks followed by open discussion and snacks".to_string(),
            category: CategoryId(1),
            location: Location {
                lat: 59.93,
                lon: 30.31,
            },
            paid: Some(false),
            participant_limit: Some(0),
            request_moderation: Some(true),
            event_date,
        }
    }

    /// A service wired to `stats`, the test clock and a short stats timeout.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn service(stats: Arc<dyn StatsClient>) -> EventService {
        let config = ViewConfig {
            query_timeout: std::time::Duration::from_millis(200),
            ..ViewConfig::default()
        };
        let views = ViewAggregator::new(stats, Arc::new(test_clock()), config);
        EventService::new(Arc::new(Registry::new()), environment(), views)
    }

    /// Creates and publishes an event owned by `initiator`.
    ///
    /// # Panics
    ///
    /// Panics if creation or publication fails.
    #[allow(clippy::expect_used)]
    pub async fn published_event(
        service: &EventService,
        initiator: UserId,
        participant_limit: i64,
        request_moderation: bool,
    ) -> Event {
        let mut draft = draft(10);
        draft.participant_limit = Some(participant_limit);
        draft.request_moderation = Some(request_moderation);

        let event = service
            .create_event(initiator, draft)
            .await
            .expect("fixture draft should be valid");
        service
            .update_by_admin(
                event.id,
                AdminUpdate {
                    action: Some(AdminAction::PublishEvent),
                    ..AdminUpdate::default()
                },
            )
            .await
            .expect("fresh event should be publishable")
    }
}

pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use stats_mocks::{FailingStatsCollector, InMemoryStatsCollector, SlowStatsCollector};
