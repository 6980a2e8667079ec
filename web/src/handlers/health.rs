//! Health check endpoint.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness check.
///
/// Returns 200 OK while the process is serving. The stats collector is
/// not consulted since reads degrade gracefully without it.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
