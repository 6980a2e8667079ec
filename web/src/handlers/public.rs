//! Anonymous endpoints under `/events`. Every call records a view hit.

use crate::dto::{EventResponse, PublicSearchParams};
use crate::extractors::{AppPath, AppQuery, ClientIp};
use crate::state::AppState;
use crate::WebResult;
use axum::{extract::State, http::Uri, Json};
use ewm_core::stats::event_uri;
use ewm_core::types::{ClientContext, EventId};
use uuid::Uuid;

/// Browse published events.
///
/// # Example
///
/// ```bash
/// curl 'http://localhost:8080/events?text=rust&categories=1,2&onlyAvailable=true&sort=VIEWS&from=0&size=10'
/// ```
///
/// # Errors
///
/// 400 for malformed filters or an inverted date range.
pub async fn list_events(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    uri: Uri,
    AppQuery(params): AppQuery<PublicSearchParams>,
) -> WebResult<Json<Vec<EventResponse>>> {
    let filter = params.into_filter()?;
    let context = ClientContext {
        ip: ip.to_string(),
        endpoint: uri.path().to_string(),
    };
    let events = state.service.list_public(&filter, &context).await?;

    Ok(Json(events.iter().map(EventResponse::from).collect()))
}

/// Get a published event with its distinct-visitor view count.
///
/// # Errors
///
/// 404 if the event does not exist or is not published.
pub async fn get_event(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppPath(event_id): AppPath<Uuid>,
) -> WebResult<Json<EventResponse>> {
    let event_id = EventId::from_uuid(event_id);
    let context = ClientContext {
        ip: ip.to_string(),
        endpoint: event_uri(event_id),
    };
    let event = state.service.get_public(event_id, &context).await?;

    Ok(Json(EventResponse::from(&event)))
}
