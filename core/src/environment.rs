//! Injected dependencies shared by the reducers.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Clock trait for time abstraction.
///
/// Production uses [`SystemClock`]; tests inject a fixed clock so lead-time
/// checks are deterministic.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Minimum distance between "now" and an event's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadTimes {
    /// Applies to creation and initiator updates.
    pub initiator: Duration,
    /// Applies to admin updates.
    pub admin: Duration,
}

impl LeadTimes {
    /// Builds lead times from whole hours.
    ///
    /// An out-of-range value falls back to its default.
    #[must_use]
    pub fn from_hours(initiator: i64, admin: i64) -> Self {
        let defaults = Self::default();
        Self {
            initiator: Duration::try_hours(initiator).unwrap_or(defaults.initiator),
            admin: Duration::try_hours(admin).unwrap_or(defaults.admin),
        }
    }
}

impl Default for LeadTimes {
    fn default() -> Self {
        Self {
            initiator: Duration::minutes(120),
            admin: Duration::minutes(60),
        }
    }
}

/// Environment for the lifecycle and allocation reducers.
#[derive(Clone)]
pub struct DomainEnvironment {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Event date lead times.
    pub lead_times: LeadTimes,
}

impl DomainEnvironment {
    /// Creates an environment with the given clock and lead times.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, lead_times: LeadTimes) -> Self {
        Self { clock, lead_times }
    }
}

impl std::fmt::Debug for DomainEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainEnvironment")
            .field("lead_times", &self.lead_times)
            .finish_non_exhaustive()
    }
}
