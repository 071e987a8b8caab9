//! Errors produced on the command side.

use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Anything that can stop a command between dispatch and append.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The event log refused a read or an append.
    #[error("Event log error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The aggregate turned the command down.
    #[error("Order rejected: {0}")]
    Order(OrderError),

    /// No events exist for the addressed order.
    #[error("{aggregate_type} not found: {order_id}")]
    NotFound {
        aggregate_type: &'static str,
        order_id: String,
    },

    /// A create command addressed an order that already has history.
    #[error("{aggregate_type} already exists: {order_id}")]
    AlreadyExists {
        aggregate_type: &'static str,
        order_id: String,
    },

    /// Command timed out waiting for its per-order execution slot.
    #[error("Timed out waiting to execute a command for order {order_id}")]
    Timeout { order_id: String },

    /// An event payload failed to encode or decode.
    #[error("Event payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true when the failed command can be retried after reloading
    /// the aggregate.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })
        )
    }
}
