use std::sync::Arc;

use async_trait::async_trait;

use crate::{EventEnvelope, Result};

/// Downstream delivery of freshly appended events.
///
/// The dispatcher hands every successfully appended envelope to a publisher;
/// the projection side decides whether delivery is synchronous or queued.
/// Publishers must preserve the order of events within a single `publish`
/// call, and successive calls for the same order arrive in append order
/// because the dispatcher serializes commands per order.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Delivers appended events, in slice order.
    async fn publish(&self, events: &[EventEnvelope]) -> Result<()>;
}

/// A shared publisher delegates to the inner implementation, so consumers
/// can hold an `Arc<P>` wherever an `EventPublisher` is expected.
#[async_trait]
impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    async fn publish(&self, events: &[EventEnvelope]) -> Result<()> {
        (**self).publish(events).await
    }
}

/// Publisher that drops everything. For tests and tools that only exercise
/// the write path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl NullPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish(&self, _events: &[EventEnvelope]) -> Result<()> {
        Ok(())
    }
}
