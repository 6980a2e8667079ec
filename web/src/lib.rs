//! HTTP surface of the EWM event service.
//!
//! Handlers stay thin: extract and validate the request shape, call
//! [`ewm_core::service::EventService`], and map the result or the
//! [`ewm_core::DomainError`] to a response.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** (path, query, JSON body, client IP)
//! 3. **Convert DTOs** into domain commands and filters
//! 4. **Call the service**, which serializes mutations per event
//! 5. **Map result** to a camelCase JSON response or an [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use ewm_web::{routes::build_router, AppState};
//!
//! let app = build_router(AppState::new(Arc::new(service)));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::AppError;
pub use extractors::{AppJson, AppPath, AppQuery, ClientIp};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
