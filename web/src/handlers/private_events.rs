//! Initiator endpoints under `/users/{userId}/events`.
//!
//! - POST / - Create an event (201)
//! - GET / - List the initiator's events
//! - GET /{eventId} - One of the initiator's events
//! - PATCH /{eventId} - Edit, send to review or cancel review
//! - GET /{eventId}/requests - Requests to the event
//! - PATCH /{eventId}/requests - Confirm or reject requests in bulk

use crate::dto::{
    EventResponse, NewEventRequest, PageParams, RequestResponse, StatusUpdateRequest,
    StatusUpdateResponse, UpdateEventRequest,
};
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use crate::WebResult;
use axum::{extract::State, http::StatusCode, Json};
use ewm_core::types::{EventId, InitiatorUpdate, UserId};
use uuid::Uuid;

/// Create a new event in `PENDING` state.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/users/{userId}/events \
///   -H "Content-Type: application/json" \
///   -d '{
///     "title": "Rust Belt Meetup",
///     "annotation": "An evening of talks about async Rust",
///     "description": "Three short talks followed by open discussion",
///     "category": 1,
///     "location": {"lat": 59.93, "lon": 30.31},
///     "eventDate": "2025-06-01 18:30:00"
///   }'
/// ```
///
/// # Errors
///
/// 400 for invalid fields or an event date too close to now.
pub async fn create_event(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(body): AppJson<NewEventRequest>,
) -> WebResult<(StatusCode, Json<EventResponse>)> {
    let event = state
        .service
        .create_event(UserId::from_uuid(user_id), body.into())
        .await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(&event))))
}

/// List the initiator's events in creation order.
///
/// # Errors
///
/// 400 for malformed paging.
pub async fn list_events(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
    AppQuery(params): AppQuery<PageParams>,
) -> WebResult<Json<Vec<EventResponse>>> {
    let page = params.page()?;
    let events = state
        .service
        .initiator_events(UserId::from_uuid(user_id), page)
        .await;

    Ok(Json(events.iter().map(EventResponse::from).collect()))
}

/// Get one of the initiator's events.
///
/// # Errors
///
/// 404 if the event does not exist or belongs to someone else.
pub async fn get_event(
    State(state): State<AppState>,
    AppPath((user_id, event_id)): AppPath<(Uuid, Uuid)>,
) -> WebResult<Json<EventResponse>> {
    let event = state
        .service
        .initiator_event(UserId::from_uuid(user_id), EventId::from_uuid(event_id))
        .await?;

    Ok(Json(EventResponse::from(&event)))
}

/// Edit an unpublished event, optionally sending it to review or
/// cancelling review via `stateAction`.
///
/// # Errors
///
/// - 400 for invalid fields, an unknown `stateAction` or a too-close date
/// - 404 if the event does not exist or belongs to someone else
/// - 409 if the event is already published
pub async fn update_event(
    State(state): State<AppState>,
    AppPath((user_id, event_id)): AppPath<(Uuid, Uuid)>,
    AppJson(body): AppJson<UpdateEventRequest>,
) -> WebResult<Json<EventResponse>> {
    let (patch, action) = body.for_initiator()?;
    let event = state
        .service
        .update_by_initiator(
            UserId::from_uuid(user_id),
            EventId::from_uuid(event_id),
            InitiatorUpdate { patch, action },
        )
        .await?;

    Ok(Json(EventResponse::from(&event)))
}

/// List the participation requests made to the initiator's event.
///
/// # Errors
///
/// 404 if the event does not exist or belongs to someone else.
pub async fn event_requests(
    State(state): State<AppState>,
    AppPath((user_id, event_id)): AppPath<(Uuid, Uuid)>,
) -> WebResult<Json<Vec<RequestResponse>>> {
    let requests = state
        .service
        .allocator()
        .event_requests(UserId::from_uuid(user_id), EventId::from_uuid(event_id))
        .await?;

    Ok(Json(requests.iter().map(RequestResponse::from).collect()))
}

/// Confirm or reject pending requests in bulk.
///
/// When confirming, requests are taken in the given order until the
/// participant limit is reached; the rest are rejected.
///
/// # Example
///
/// ```bash
/// curl -X PATCH http://localhost:8080/users/{userId}/events/{eventId}/requests \
///   -H "Content-Type: application/json" \
///   -d '{"requestIds": ["…", "…"], "status": "CONFIRMED"}'
/// ```
///
/// # Errors
///
/// - 400 for an empty list, duplicates or a status other than
///   `CONFIRMED` / `REJECTED`
/// - 404 if the event or a request is unknown, or the caller is not the initiator
/// - 409 if the limit is already reached or a request is not pending
pub async fn update_request_statuses(
    State(state): State<AppState>,
    AppPath((user_id, event_id)): AppPath<(Uuid, Uuid)>,
    AppJson(body): AppJson<StatusUpdateRequest>,
) -> WebResult<Json<StatusUpdateResponse>> {
    let (request_ids, status) = body.into_parts()?;
    let result = state
        .service
        .allocator()
        .bulk_update_status(
            UserId::from_uuid(user_id),
            EventId::from_uuid(event_id),
            request_ids,
            status,
        )
        .await?;

    Ok(Json(StatusUpdateResponse::from(&result)))
}
