use std::pin::Pin;

use async_trait::async_trait;
use common::OrderId;
use futures_core::Stream;
use thiserror::Error;

use crate::{EventEnvelope, Result, Version};

/// A stream of events, oldest first.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// The append-only event log.
///
/// The log is the sole source of truth: order state is always reconstructed
/// by replaying the events returned here, never read from anywhere else.
/// Implementations must be thread-safe.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events for one order.
    ///
    /// The append is atomic: either every event is durably recorded and the
    /// stream version advances, or the log is left untouched. When
    /// `options.expected_version` is set and the stored version has moved
    /// past it, the append fails with `ConcurrencyConflict`.
    ///
    /// Returns the stream version after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// All events for one order, in append order. Empty when the order has
    /// no events.
    async fn events_for_order(&self, order_id: &OrderId) -> Result<Vec<EventEnvelope>>;

    /// Every event in the log, in insertion order. Used for projection
    /// catch-up and rebuilds.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Current stream version for an order, or None when it has no events.
    async fn order_version(&self, order_id: &OrderId) -> Result<Option<Version>>;
}

/// Convenience methods available on every [`EventStore`].
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    async fn order_exists(&self, order_id: &OrderId) -> Result<bool> {
        Ok(self.order_version(order_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Options controlling an append.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Version the caller last observed, for optimistic concurrency control.
    /// None skips the check entirely (use with caution).
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// No version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail unless the stream is exactly at `version`.
    pub fn expect_version(version: impl Into<Version>) -> Self {
        Self {
            expected_version: Some(version.into()),
        }
    }

    /// Fail unless the order has no events yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// A malformed append batch, rejected before touching the log.
#[derive(Debug, Clone, Error)]
#[error("Append validation error: {message}")]
pub struct AppendValidationError {
    pub message: String,
}

impl AppendValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rejects empty batches, batches that mix orders, and version gaps.
pub fn validate_events_for_append(
    events: &[EventEnvelope],
) -> std::result::Result<(), AppendValidationError> {
    if events.is_empty() {
        return Err(AppendValidationError::new("Cannot append an empty batch"));
    }

    for pair in events.windows(2) {
        if pair[1].order_id != pair[0].order_id {
            return Err(AppendValidationError::new(
                "All events in a batch must belong to the same order",
            ));
        }
        if pair[1].version != pair[0].version.next() {
            return Err(AppendValidationError::new(format!(
                "Event versions must be sequential. Expected {}, got {}",
                pair[0].version.next(),
                pair[1].version
            )));
        }
    }

    Ok(())
}
