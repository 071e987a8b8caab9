//! Failure modes of the read-model side.

use common::OrderId;
use thiserror::Error;

/// Why a projection could not handle a delivered event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Reading the log during catch-up or rebuild failed.
    #[error("Event log error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// The delivered payload did not parse as the named event type.
    #[error("Undecodable event payload: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A non-creation event arrived for an order with no summary row. Events
    /// are delivered in per-order append order, so this can only mean the
    /// log or the read model is corrupt for that order.
    #[error("No summary row for order {order_id} while handling {event_type}")]
    SummaryMissing {
        order_id: OrderId,
        event_type: String,
    },
}

/// Alias used by projection handlers.
pub type Result<T> = std::result::Result<T, ProjectionError>;
