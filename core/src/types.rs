//! Domain types for events and participation requests.
//!
//! Identifiers are UUID newtypes except [`CategoryId`], which refers to
//! the numeric category catalogue owned by another service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `EventId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier for a user (initiator or requester).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a participation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random `RequestId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category reference. Categories live in an external catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Lifecycle enums
// ============================================================================

/// Moderation state of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    /// Awaiting admin review.
    Pending,
    /// Visible to the public, accepting requests.
    Published,
    /// Withdrawn by the initiator or rejected by an admin.
    Canceled,
}

impl EventState {
    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PUBLISHED" => Ok(Self::Published),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(format!("Unknown event state: {other}")),
        }
    }
}

/// Status of a participation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Waiting for the initiator's decision.
    Pending,
    /// Holds a slot of the event's participant limit.
    Confirmed,
    /// Declined by the initiator or by capacity exhaustion.
    Rejected,
    /// Withdrawn by the requester.
    Canceled,
}

impl RequestStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(format!("Unknown request status: {other}")),
        }
    }
}

/// State transition an initiator may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitiatorAction {
    /// Move the event back into the review queue.
    SendToReview,
    /// Withdraw the event from review.
    CancelReview,
}

impl FromStr for InitiatorAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEND_TO_REVIEW" => Ok(Self::SendToReview),
            "CANCEL_REVIEW" => Ok(Self::CancelReview),
            other => Err(format!("Unknown initiator state action: {other}")),
        }
    }
}

/// State transition an admin may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminAction {
    /// Publish a pending event.
    PublishEvent,
    /// Reject an event that is not yet published.
    RejectEvent,
}

impl FromStr for AdminAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLISH_EVENT" => Ok(Self::PublishEvent),
            "REJECT_EVENT" => Ok(Self::RejectEvent),
            other => Err(format!("Unknown admin state action: {other}")),
        }
    }
}

/// Sort order for public listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Latest event date first.
    EventDate,
    /// Most viewed first.
    Views,
}

impl SortKey {
    /// Parses a sort key, returning `None` for anything unrecognised.
    ///
    /// Unknown keys leave the listing in its natural order.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EVENT_DATE" => Some(Self::EventDate),
            "VIEWS" => Some(Self::Views),
            _ => None,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Geographic coordinates of an event venue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// An event organised by an initiator.
///
/// `confirmed_requests` is a denormalised counter of CONFIRMED requests.
/// Only the request allocator changes it, so it is private here.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Short title.
    pub title: String,
    /// Summary shown in listings.
    pub annotation: String,
    /// Full description.
    pub description: String,
    /// Category reference.
    pub category: CategoryId,
    /// Venue coordinates.
    pub location: Location,
    /// Whether attendance is paid.
    pub paid: bool,
    /// Maximum number of confirmed participants, 0 means unlimited.
    pub participant_limit: u32,
    /// Whether requests need the initiator's approval.
    pub request_moderation: bool,
    /// When the event takes place.
    pub event_date: DateTime<Utc>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Publication time, set on `PUBLISH_EVENT`.
    pub published_on: Option<DateTime<Utc>>,
    /// Moderation state.
    pub state: EventState,
    /// Owner of the event.
    pub initiator: UserId,
    /// Cached view count, refreshed from the stats collector on reads.
    pub views: u64,
    confirmed_requests: u32,
}

impl Event {
    pub(crate) fn open(
        id: EventId,
        initiator: UserId,
        draft: NewEvent,
        participant_limit: u32,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: draft.title,
            annotation: draft.annotation,
            description: draft.description,
            category: draft.category,
            location: draft.location,
            paid: draft.paid.unwrap_or(false),
            participant_limit,
            request_moderation: draft.request_moderation.unwrap_or(true),
            event_date: draft.event_date,
            created_on,
            published_on: None,
            state: EventState::Pending,
            initiator,
            views: 0,
            confirmed_requests: 0,
        }
    }

    /// Number of CONFIRMED requests for this event.
    #[must_use]
    pub const fn confirmed_requests(&self) -> u32 {
        self.confirmed_requests
    }

    /// Whether the participant limit is unlimited.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.participant_limit == 0
    }

    /// Remaining confirmable slots, `None` when unlimited.
    #[must_use]
    pub const fn free_slots(&self) -> Option<u32> {
        if self.is_unlimited() {
            None
        } else {
            Some(self.participant_limit.saturating_sub(self.confirmed_requests))
        }
    }

    pub(crate) const fn add_confirmed(&mut self, count: u32) {
        self.confirmed_requests += count;
    }

    pub(crate) const fn release_confirmed(&mut self) {
        self.confirmed_requests = self.confirmed_requests.saturating_sub(1);
    }
}

/// A user's request to attend an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipationRequest {
    /// Request identifier.
    pub id: RequestId,
    /// Target event.
    pub event: EventId,
    /// User asking to attend.
    pub requester: UserId,
    /// Submission time.
    pub created: DateTime<Utc>,
    /// Current status.
    pub status: RequestStatus,
}

// ============================================================================
// Commands
// ============================================================================

/// Draft of a new event as submitted by its initiator.
///
/// `participant_limit` is signed so negative input can be rejected
/// instead of silently wrapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Title, 3 to 120 characters.
    pub title: String,
    /// Annotation, 20 to 2000 characters.
    pub annotation: String,
    /// Description, 20 to 7000 characters.
    pub description: String,
    /// Category reference.
    pub category: CategoryId,
    /// Venue coordinates.
    pub location: Location,
    /// Defaults to `false`.
    pub paid: Option<bool>,
    /// Defaults to 0 (unlimited).
    pub participant_limit: Option<i64>,
    /// Defaults to `true`.
    pub request_moderation: Option<bool>,
    /// When the event takes place.
    pub event_date: DateTime<Utc>,
}

/// Partial update of event details. `None` fields stay unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    /// New title.
    pub title: Option<String>,
    /// New annotation.
    pub annotation: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<CategoryId>,
    /// New venue.
    pub location: Option<Location>,
    /// New paid flag.
    pub paid: Option<bool>,
    /// New participant limit.
    pub participant_limit: Option<i64>,
    /// New moderation flag.
    pub request_moderation: Option<bool>,
    /// New event date.
    pub event_date: Option<DateTime<Utc>>,
}

/// Update submitted by the event's initiator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InitiatorUpdate {
    /// Detail changes.
    pub patch: EventPatch,
    /// Optional state transition.
    pub action: Option<InitiatorAction>,
}

/// Update submitted by an admin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdminUpdate {
    /// Detail changes.
    pub patch: EventPatch,
    /// Optional state transition.
    pub action: Option<AdminAction>,
}

/// Outcome of a bulk status change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusUpdateResult {
    /// Requests confirmed by this call.
    pub confirmed_requests: Vec<ParticipationRequest>,
    /// Requests rejected by this call.
    pub rejected_requests: Vec<ParticipationRequest>,
}

/// Where a view hit originated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientContext {
    /// Client IP address as reported by the transport.
    pub ip: String,
    /// Request path, e.g. `/events` or `/events/{id}`.
    pub endpoint: String,
}
