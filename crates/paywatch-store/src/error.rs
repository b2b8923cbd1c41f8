//! Error types for paywatch storage.
//!
//! Note that a redelivered webhook event is *not* an error: `record_event`
//! reports it as [`crate::RecordOutcome::Duplicate`] so callers can treat
//! at-least-once delivery as a no-op instead of a failure.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,
}
