//! Queued delivery of appended events into the projection side.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventEnvelope, EventPublisher, EventStore, EventStoreError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ProjectionProcessor;

/// Publisher backing the live projection feed.
///
/// `publish` enqueues envelopes on an unbounded channel; a spawned worker
/// drains the channel into a [`ProjectionProcessor`]. Commands complete
/// without waiting for read models to catch up, so a read issued right
/// after a write may still see the previous state. Per-order delivery
/// order is preserved because the dispatcher serializes commands per order
/// and the channel is FIFO.
#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<EventEnvelope>,
}

impl ChannelPublisher {
    /// Spawns the worker draining into the processor and returns the
    /// publisher together with the worker's join handle. Dropping every
    /// clone of the publisher closes the channel; the worker finishes the
    /// backlog and exits.
    pub fn spawn<S>(processor: Arc<ProjectionProcessor<S>>) -> (Self, JoinHandle<()>)
    where
        S: EventStore + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EventEnvelope>();

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                // Failures are logged and the order quarantined inside
                // deliver; the worker just keeps draining.
                let _ = processor.deliver(&event).await;
            }
            tracing::debug!("projection feed closed; worker exiting");
        });

        (Self { sender }, worker)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, events: &[EventEnvelope]) -> event_store::Result<()> {
        for event in events {
            self.sender
                .send(event.clone())
                .map_err(|_| EventStoreError::Publish("projection worker stopped".to_string()))?;
        }
        Ok(())
    }
}
