//! JSON and query-string shapes of the HTTP API.
//!
//! Field names are camelCase and timestamps use `yyyy-MM-dd HH:mm:ss`.
//! Lists in query strings are comma-separated, e.g.
//! `?states=PENDING,PUBLISHED&categories=1,2`.

use chrono::{DateTime, Utc};
use ewm_core::query::{AdminFilter, Page, PublicFilter};
use ewm_core::types::{
    AdminAction, CategoryId, Event, EventPatch, EventState, InitiatorAction, Location, NewEvent,
    ParticipationRequest, RequestId, RequestStatus, SortKey, StatusUpdateResult, UserId,
};
use ewm_core::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Responses
// ============================================================================

/// Full event representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// Event ID
    pub id: Uuid,
    /// Title
    pub title: String,
    /// Annotation
    pub annotation: String,
    /// Description
    pub description: String,
    /// Category reference
    pub category: u64,
    /// Venue
    pub location: Location,
    /// Paid attendance
    pub paid: bool,
    /// Participant limit, 0 is unlimited
    pub participant_limit: u32,
    /// Whether requests need approval
    pub request_moderation: bool,
    /// Event date
    #[serde(with = "ewm_core::timestamp")]
    pub event_date: DateTime<Utc>,
    /// Creation time
    #[serde(with = "ewm_core::timestamp")]
    pub created_on: DateTime<Utc>,
    /// Publication time
    #[serde(default, with = "ewm_core::timestamp::option")]
    pub published_on: Option<DateTime<Utc>>,
    /// Moderation state
    pub state: EventState,
    /// Initiator ID
    pub initiator: Uuid,
    /// View count
    pub views: u64,
    /// Number of confirmed requests
    pub confirmed_requests: u32,
}

impl From<&Event> for EventResponse {
    fn from(event: &Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            title: event.title.clone(),
            annotation: event.annotation.clone(),
            description: event.description.clone(),
            category: event.category.0,
            location: event.location,
            paid: event.paid,
            participant_limit: event.participant_limit,
            request_moderation: event.request_moderation,
            event_date: event.event_date,
            created_on: event.created_on,
            published_on: event.published_on,
            state: event.state,
            initiator: *event.initiator.as_uuid(),
            views: event.views,
            confirmed_requests: event.confirmed_requests(),
        }
    }
}

/// Participation request representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    /// Request ID
    pub id: Uuid,
    /// Event ID
    pub event: Uuid,
    /// Requester ID
    pub requester: Uuid,
    /// Submission time
    #[serde(with = "ewm_core::timestamp")]
    pub created: DateTime<Utc>,
    /// Status
    pub status: RequestStatus,
}

impl From<&ParticipationRequest> for RequestResponse {
    fn from(request: &ParticipationRequest) -> Self {
        Self {
            id: *request.id.as_uuid(),
            event: *request.event.as_uuid(),
            requester: *request.requester.as_uuid(),
            created: request.created,
            status: request.status,
        }
    }
}

/// Outcome of a bulk status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    /// Requests confirmed by the call
    pub confirmed_requests: Vec<RequestResponse>,
    /// Requests rejected by the call
    pub rejected_requests: Vec<RequestResponse>,
}

impl From<&StatusUpdateResult> for StatusUpdateResponse {
    fn from(result: &StatusUpdateResult) -> Self {
        Self {
            confirmed_requests: result.confirmed_requests.iter().map(RequestResponse::from).collect(),
            rejected_requests: result.rejected_requests.iter().map(RequestResponse::from).collect(),
        }
    }
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /users/{userId}/events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventRequest {
    /// Title
    pub title: String,
    /// Annotation
    pub annotation: String,
    /// Description
    pub description: String,
    /// Category reference
    pub category: u64,
    /// Venue
    pub location: Location,
    /// Paid attendance
    #[serde(default)]
    pub paid: Option<bool>,
    /// Participant limit
    #[serde(default)]
    pub participant_limit: Option<i64>,
    /// Whether requests need approval
    #[serde(default)]
    pub request_moderation: Option<bool>,
    /// Event date
    #[serde(with = "ewm_core::timestamp")]
    pub event_date: DateTime<Utc>,
}

impl From<NewEventRequest> for NewEvent {
    fn from(body: NewEventRequest) -> Self {
        Self {
            title: body.title,
            annotation: body.annotation,
            description: body.description,
            category: CategoryId(body.category),
            location: body.location,
            paid: body.paid,
            participant_limit: body.participant_limit,
            request_moderation: body.request_moderation,
            event_date: body.event_date,
        }
    }
}

/// Body of the initiator and admin `PATCH` on an event.
///
/// `stateAction` is kept as a string so unknown values are reported as a
/// validation error naming the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New annotation
    #[serde(default)]
    pub annotation: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New category
    #[serde(default)]
    pub category: Option<u64>,
    /// New venue
    #[serde(default)]
    pub location: Option<Location>,
    /// New paid flag
    #[serde(default)]
    pub paid: Option<bool>,
    /// New participant limit
    #[serde(default)]
    pub participant_limit: Option<i64>,
    /// New moderation flag
    #[serde(default)]
    pub request_moderation: Option<bool>,
    /// New event date
    #[serde(default, with = "ewm_core::timestamp::option")]
    pub event_date: Option<DateTime<Utc>>,
    /// Requested transition
    #[serde(default)]
    pub state_action: Option<String>,
}

impl UpdateEventRequest {
    /// Splits the body into detail changes and the parsed transition.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `stateAction` is not a
    /// known value of `A`.
    pub fn into_parts<A>(self) -> Result<(EventPatch, Option<A>)>
    where
        A: FromStr<Err = String>,
    {
        let action = self
            .state_action
            .as_deref()
            .map(str::parse::<A>)
            .transpose()
            .map_err(DomainError::validation)?;

        let patch = EventPatch {
            title: self.title,
            annotation: self.annotation,
            description: self.description,
            category: self.category.map(CategoryId),
            location: self.location,
            paid: self.paid,
            participant_limit: self.participant_limit,
            request_moderation: self.request_moderation,
            event_date: self.event_date,
        };
        Ok((patch, action))
    }

    /// Parses the body for an initiator.
    ///
    /// # Errors
    ///
    /// See [`UpdateEventRequest::into_parts`].
    pub fn for_initiator(self) -> Result<(EventPatch, Option<InitiatorAction>)> {
        self.into_parts()
    }

    /// Parses the body for an admin.
    ///
    /// # Errors
    ///
    /// See [`UpdateEventRequest::into_parts`].
    pub fn for_admin(self) -> Result<(EventPatch, Option<AdminAction>)> {
        self.into_parts()
    }
}

/// Body of `PATCH /users/{userId}/events/{eventId}/requests`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    /// Requests to update, in processing order
    pub request_ids: Vec<Uuid>,
    /// `CONFIRMED` or `REJECTED`
    pub status: String,
}

impl StatusUpdateRequest {
    /// Parses the target status and converts the ids.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for an unknown status.
    pub fn into_parts(self) -> Result<(Vec<RequestId>, RequestStatus)> {
        let status = self.status.parse::<RequestStatus>().map_err(DomainError::validation)?;
        let ids = self.request_ids.into_iter().map(RequestId::from_uuid).collect();
        Ok((ids, status))
    }
}

// ============================================================================
// Query strings
// ============================================================================

/// `from` / `size` paging parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// Items to skip, default 0
    pub from: Option<usize>,
    /// Page size, default 10
    pub size: Option<usize>,
}

impl PageParams {
    /// Converts to a [`Page`].
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `size` is zero.
    pub fn page(self) -> Result<Page> {
        let defaults = Page::default();
        let size = self.size.unwrap_or(defaults.size);
        if size == 0 {
            return Err(DomainError::validation("size must be positive"));
        }
        Ok(Page::new(self.from.unwrap_or(defaults.from), size))
    }
}

/// Query of `POST /users/{userId}/requests`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitParams {
    /// Target event
    pub event_id: Uuid,
}

/// Query of `GET /admin/events`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSearchParams {
    /// Comma-separated initiator IDs
    pub users: Option<String>,
    /// Comma-separated states
    pub states: Option<String>,
    /// Comma-separated category IDs
    pub categories: Option<String>,
    /// Earliest event date
    pub range_start: Option<String>,
    /// Latest event date
    pub range_end: Option<String>,
    /// Paging offset
    pub from: Option<usize>,
    /// Page size
    pub size: Option<usize>,
}

impl AdminSearchParams {
    /// Builds the domain filter.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for malformed list items,
    /// timestamps or paging.
    pub fn into_filter(self) -> Result<AdminFilter> {
        let users: Vec<Uuid> = parse_list(self.users.as_deref(), "users")?;
        Ok(AdminFilter {
            users: users.into_iter().map(UserId::from_uuid).collect(),
            states: parse_list(self.states.as_deref(), "states")?,
            categories: parse_categories(self.categories.as_deref())?,
            range_start: parse_time(self.range_start.as_deref(), "rangeStart")?,
            range_end: parse_time(self.range_end.as_deref(), "rangeEnd")?,
            page: PageParams {
                from: self.from,
                size: self.size,
            }
            .page()?,
        })
    }
}

/// Query of `GET /events`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSearchParams {
    /// Text searched in annotation and description
    pub text: Option<String>,
    /// Comma-separated category IDs
    pub categories: Option<String>,
    /// Paid flag
    pub paid: Option<bool>,
    /// Earliest event date
    pub range_start: Option<String>,
    /// Latest event date
    pub range_end: Option<String>,
    /// Only events with free slots
    #[serde(default)]
    pub only_available: bool,
    /// `EVENT_DATE` or `VIEWS`
    pub sort: Option<String>,
    /// Paging offset
    pub from: Option<usize>,
    /// Page size
    pub size: Option<usize>,
}

impl PublicSearchParams {
    /// Builds the domain filter. Unknown sort keys mean no sort.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for malformed list items,
    /// timestamps or paging.
    pub fn into_filter(self) -> Result<PublicFilter> {
        Ok(PublicFilter {
            text: self.text.filter(|text| !text.trim().is_empty()),
            categories: parse_categories(self.categories.as_deref())?,
            paid: self.paid,
            range_start: parse_time(self.range_start.as_deref(), "rangeStart")?,
            range_end: parse_time(self.range_end.as_deref(), "rangeEnd")?,
            only_available: self.only_available,
            sort: self.sort.as_deref().and_then(SortKey::parse),
            page: PageParams {
                from: self.from,
                size: self.size,
            }
            .page()?,
        })
    }
}

fn parse_list<T>(raw: Option<&str>, field: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(Vec::new()), |raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<T>()
                    .map_err(|e| DomainError::validation(format!("Invalid {field} value '{item}': {e}")))
            })
            .collect()
    })
}

fn parse_categories(raw: Option<&str>) -> Result<Vec<CategoryId>> {
    let ids: Vec<u64> = parse_list(raw, "categories")?;
    Ok(ids.into_iter().map(CategoryId).collect())
}

fn parse_time(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    raw.map(|value| {
        ewm_core::timestamp::parse(value)
            .map_err(|_| DomainError::validation(format!("{field} must match yyyy-MM-dd HH:mm:ss, got '{value}'")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_params_parse_comma_lists() {
        let user = Uuid::new_v4();
        let params = AdminSearchParams {
            users: Some(user.to_string()),
            states: Some("PENDING, PUBLISHED".to_string()),
            categories: Some("1,2,".to_string()),
            range_start: Some("2025-03-01 10:00:00".to_string()),
            ..AdminSearchParams::default()
        };

        let filter = params.into_filter().expect("valid params");
        assert_eq!(filter.users, vec![UserId::from_uuid(user)]);
        assert_eq!(filter.states, vec![EventState::Pending, EventState::Published]);
        assert_eq!(filter.categories, vec![CategoryId(1), CategoryId(2)]);
        assert_eq!(
            filter.range_start.map(|t| ewm_core::timestamp::format(&t)),
            Some("2025-03-01 10:00:00".to_string())
        );
        assert_eq!(filter.page, Page::default());
    }

    #[test]
    fn test_unknown_state_is_validation_error() {
        let params = AdminSearchParams {
            states: Some("DRAFT".to_string()),
            ..AdminSearchParams::default()
        };
        assert!(matches!(params.into_filter(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let params = PageParams {
            from: None,
            size: Some(0),
        };
        assert!(matches!(params.page(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_unknown_sort_is_ignored() {
        let params = PublicSearchParams {
            sort: Some("RANDOM".to_string()),
            ..PublicSearchParams::default()
        };
        assert_eq!(params.into_filter().expect("valid params").sort, None);
    }

    #[test]
    fn test_unknown_state_action_is_validation_error() {
        let body = UpdateEventRequest {
            state_action: Some("PUBLISH".to_string()),
            ..UpdateEventRequest::default()
        };
        assert!(matches!(body.for_admin(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_event_date_uses_wire_format() {
        let body: UpdateEventRequest =
            serde_json::from_str(r#"{"eventDate":"2025-06-01 18:30:00","stateAction":"SEND_TO_REVIEW"}"#)
                .expect("valid body");
        let (patch, action) = body.for_initiator().expect("valid body");
        assert_eq!(action, Some(InitiatorAction::SendToReview));
        assert_eq!(
            patch.event_date.map(|t| ewm_core::timestamp::format(&t)),
            Some("2025-06-01 18:30:00".to_string())
        );
    }
}
