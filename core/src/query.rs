//! Filters and paging for event listings.

use crate::error::{DomainError, Result};
use crate::types::{CategoryId, Event, EventState, SortKey, UserId};
use chrono::{DateTime, Utc};

/// Offset/limit paging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// Number of items to skip.
    pub from: usize,
    /// Maximum number of items to return.
    pub size: usize,
}

impl Page {
    /// Creates a page.
    #[must_use]
    pub const fn new(from: usize, size: usize) -> Self {
        Self { from, size }
    }

    /// Applies the page to an ordered list.
    #[must_use]
    pub fn slice<T>(self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.from).take(self.size).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { from: 0, size: 10 }
    }
}

fn check_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(DomainError::validation(
                "rangeEnd must not be earlier than rangeStart",
            ));
        }
    }
    Ok(())
}

/// Admin search criteria. Empty lists match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminFilter {
    /// Initiators to include.
    pub users: Vec<UserId>,
    /// States to include.
    pub states: Vec<EventState>,
    /// Categories to include.
    pub categories: Vec<CategoryId>,
    /// Earliest event date, defaults to now.
    pub range_start: Option<DateTime<Utc>>,
    /// Latest event date, inclusive.
    pub range_end: Option<DateTime<Utc>>,
    /// Paging.
    pub page: Page,
}

impl AdminFilter {
    /// Checks the date range.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `range_end` precedes `range_start`.
    pub fn validate(&self) -> Result<()> {
        check_range(self.range_start, self.range_end)
    }

    /// Whether `event` matches every criterion, with `now` as the default range start.
    #[must_use]
    pub fn matches(&self, event: &Event, now: DateTime<Utc>) -> bool {
        let start = self.range_start.unwrap_or(now);

        (self.users.is_empty() || self.users.contains(&event.initiator))
            && (self.states.is_empty() || self.states.contains(&event.state))
            && (self.categories.is_empty() || self.categories.contains(&event.category))
            && event.event_date >= start
            && self.range_end.is_none_or(|end| event.event_date <= end)
    }
}

/// Public listing criteria.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicFilter {
    /// Case-insensitive substring of annotation or description.
    pub text: Option<String>,
    /// Categories to include. Empty matches all.
    pub categories: Vec<CategoryId>,
    /// Paid flag to match.
    pub paid: Option<bool>,
    /// Earliest event date, defaults to now.
    pub range_start: Option<DateTime<Utc>>,
    /// Latest event date.
    pub range_end: Option<DateTime<Utc>>,
    /// Only events with free slots.
    pub only_available: bool,
    /// Sort order applied after view decoration.
    pub sort: Option<SortKey>,
    /// Paging applied after sorting.
    pub page: Page,
}

impl PublicFilter {
    /// Checks the date range.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `range_end` precedes `range_start`.
    pub fn validate(&self) -> Result<()> {
        check_range(self.range_start, self.range_end)
    }

    /// Whether a published `event` matches, with `now` as the default range start.
    #[must_use]
    pub fn matches(&self, event: &Event, now: DateTime<Utc>) -> bool {
        let start = self.range_start.unwrap_or(now);

        event.state == EventState::Published
            && self.text.as_deref().is_none_or(|text| {
                let needle = text.to_lowercase();
                event.annotation.to_lowercase().contains(&needle)
                    || event.description.to_lowercase().contains(&needle)
            })
            && (self.categories.is_empty() || self.categories.contains(&event.category))
            && self.paid.is_none_or(|paid| event.paid == paid)
            && event.event_date >= start
            && self.range_end.is_none_or(|end| event.event_date <= end)
            && (!self.only_available || event.free_slots() != Some(0))
    }
}
