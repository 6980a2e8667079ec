//! Admin endpoints under `/admin/events`.

use crate::dto::{AdminSearchParams, EventResponse, UpdateEventRequest};
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use crate::WebResult;
use axum::{extract::State, Json};
use ewm_core::types::{AdminUpdate, EventId};
use uuid::Uuid;

/// Search all events regardless of state.
///
/// `users`, `states` and `categories` are comma-separated lists;
/// `rangeStart` defaults to now.
///
/// # Errors
///
/// 400 for malformed filters or an inverted date range.
pub async fn search_events(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<AdminSearchParams>,
) -> WebResult<Json<Vec<EventResponse>>> {
    let filter = params.into_filter()?;
    let events = state.service.search_admin(&filter).await?;

    Ok(Json(events.iter().map(EventResponse::from).collect()))
}

/// Edit an event and optionally publish or reject it via `stateAction`.
///
/// # Errors
///
/// - 400 for invalid fields, an unknown `stateAction` or a too-close date
/// - 404 if the event does not exist
/// - 409 for a forbidden transition or a limit below the confirmed count
pub async fn update_event(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateEventRequest>,
) -> WebResult<Json<EventResponse>> {
    let (patch, action) = body.for_admin()?;
    let event = state
        .service
        .update_by_admin(EventId::from_uuid(event_id), AdminUpdate { patch, action })
        .await?;

    Ok(Json(EventResponse::from(&event)))
}
