//! Requester endpoints under `/users/{userId}/requests`.

use crate::dto::{RequestResponse, SubmitParams};
use crate::extractors::{AppPath, AppQuery};
use crate::state::AppState;
use crate::WebResult;
use axum::{extract::State, http::StatusCode, Json};
use ewm_core::types::{EventId, RequestId, UserId};
use uuid::Uuid;

/// List every request the user has made.
pub async fn list_requests(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
) -> WebResult<Json<Vec<RequestResponse>>> {
    let requests = state
        .service
        .allocator()
        .user_requests(UserId::from_uuid(user_id))
        .await;

    Ok(Json(requests.iter().map(RequestResponse::from).collect()))
}

/// Ask to attend `?eventId=`.
///
/// The request is confirmed immediately when the event needs no
/// moderation or has no limit; otherwise it waits for the initiator.
///
/// # Errors
///
/// - 404 if the event does not exist or is not published
/// - 409 for the initiator's own event, a repeated request or a full event
pub async fn submit_request(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
    AppQuery(params): AppQuery<SubmitParams>,
) -> WebResult<(StatusCode, Json<RequestResponse>)> {
    let request = state
        .service
        .allocator()
        .submit(UserId::from_uuid(user_id), EventId::from_uuid(params.event_id))
        .await?;

    Ok((StatusCode::CREATED, Json(RequestResponse::from(&request))))
}

/// Withdraw one of the user's requests, freeing its slot if it held one.
///
/// # Errors
///
/// 404 if the request does not exist or belongs to someone else.
pub async fn cancel_request(
    State(state): State<AppState>,
    AppPath((user_id, request_id)): AppPath<(Uuid, Uuid)>,
) -> WebResult<Json<RequestResponse>> {
    let request = state
        .service
        .allocator()
        .cancel(UserId::from_uuid(user_id), RequestId::from_uuid(request_id))
        .await?;

    Ok(Json(RequestResponse::from(&request)))
}
