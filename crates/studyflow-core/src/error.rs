//! Core error types for studyflow-core.
//!
//! The taxonomy follows the failure modes of the timer subsystem: validation
//! errors are surfaced synchronously to the caller, store errors at the sync
//! boundary are logged and swallowed so local state stays authoritative.

use thiserror::Error;

/// Core error type for studyflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors (blocked before any state changes)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Local or remote store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Validation errors. Surfaced synchronously; never retried.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Starting a work segment without a subject
    #[error("a subject is required to start a work segment")]
    MissingSubject,

    /// Non-positive segment duration
    #[error("invalid segment duration: {secs}s")]
    InvalidDuration { secs: i64 },

    /// Invalid field value
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors from checkpoint/session/goal stores, local or remote.
///
/// A failure here is a sync failure in the sense of the subsystem contract:
/// callers on the flush path log and swallow it, leaving local state as the
/// source of truth until the next successful write.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local SQLite failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Remote request failed (network, TLS, timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint rejected the request
    #[error("api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Write carried a version not newer than the stored checkpoint
    #[error("stale checkpoint version: stored {stored}, attempted {attempted}")]
    StaleVersion { stored: u64, attempted: u64 },

    /// Payload could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors (runtime construction, file-backed stores)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
