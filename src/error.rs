//! Error handling for the observability core
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for the observability core
pub type Result<T> = std::result::Result<T, ObservabilityError>;

/// Main error type for the observability core
#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Event bus errors
    #[error("Bus error: {0}")]
    Bus(String),

    /// Replay errors
    #[error("Replay error: {0}")]
    Replay(String),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ObservabilityError {
    /// Whether this error came from parsing a serialized document
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ObservabilityError::Serialization(_))
    }
}
