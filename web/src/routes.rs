//! Router configuration for the EWM service.

use crate::handlers::{admin, health::health_check, private_events, private_requests, public};
use crate::state::AppState;
use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/users/:user_id/events…` and `/users/:user_id/requests…`: private API
/// - `/admin/events…`: moderation
/// - `/events…`: public API
/// - `/health`: liveness
pub fn build_router(state: AppState) -> Router {
    let private_routes = Router::new()
        .route(
            "/users/:user_id/events",
            get(private_events::list_events).post(private_events::create_event),
        )
        .route(
            "/users/:user_id/events/:event_id",
            get(private_events::get_event).patch(private_events::update_event),
        )
        .route(
            "/users/:user_id/events/:event_id/requests",
            get(private_events::event_requests).patch(private_events::update_request_statuses),
        )
        .route(
            "/users/:user_id/requests",
            get(private_requests::list_requests).post(private_requests::submit_request),
        )
        .route(
            "/users/:user_id/requests/:request_id/cancel",
            patch(private_requests::cancel_request),
        );

    let admin_routes = Router::new()
        .route("/admin/events", get(admin::search_events))
        .route("/admin/events/:event_id", patch(admin::update_event));

    let public_routes = Router::new()
        .route("/events", get(public::list_events))
        .route("/events/:event_id", get(public::get_event));

    Router::new()
        .route("/health", get(health_check))
        .merge(private_routes)
        .merge(admin_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
