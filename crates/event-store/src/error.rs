use common::OrderId;
use thiserror::Error;

use crate::Version;

/// Errors raised by event log implementations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The expected version did not match the stored version. The log was
    /// not mutated; the caller may reload and retry.
    #[error("Version conflict on order {order_id}: expected {expected}, log is at {actual}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The append batch itself was malformed (empty, mixed orders,
    /// non-sequential versions).
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// PostgreSQL failed underneath the store.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration did not complete.
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An envelope payload failed to encode or decode.
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delivery of appended events to a downstream consumer failed. The
    /// events themselves are already durably recorded.
    #[error("Event publication failed: {0}")]
    Publish(String),
}

/// Result type for event log operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
