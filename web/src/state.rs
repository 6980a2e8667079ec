//! Application state for Axum handlers.

use ewm_core::service::EventService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Event, request and view operations
    pub service: Arc<EventService>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(service: Arc<EventService>) -> Self {
        Self { service }
    }
}
