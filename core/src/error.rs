//! Error types for the EWM domain.

use std::time::Duration;
use thiserror::Error;

/// Failure of a domain operation.
///
/// Every variant carries a human-readable message. The web layer maps
/// the variant onto an HTTP status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The referenced entity does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// Input is malformed or violates a field constraint.
    #[error("{0}")]
    Validation(String),

    /// The operation conflicts with the current state.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    /// Creates a [`DomainError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates a [`DomainError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a [`DomainError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a [`DomainError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result alias for domain operations.
pub type Result<T, E = DomainError> = std::result::Result<T, E>;

/// Failure talking to the statistics collector.
///
/// Callers on the read path never surface these to clients; they log
/// and fall back to cached view counts.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The request could not be sent or the connection failed.
    #[error("Stats transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-success status.
    #[error("Stats collector returned status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("Failed to decode stats response: {0}")]
    Decode(String),

    /// The collector did not answer in time.
    #[error("Stats query timed out after {0:?}")]
    Timeout(Duration),
}
