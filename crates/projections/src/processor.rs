//! Fan-out of stored events to registered projections.

use std::collections::HashSet;

use async_trait::async_trait;
use common::OrderId;
use event_store::{EventEnvelope, EventPublisher, EventStore, EventStoreError};
use futures_util::StreamExt;
use tokio::sync::RwLock;

use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Drives projections from the event log.
///
/// Three delivery modes share the same handler path: catch-up replays the
/// whole log on startup, live delivery pushes each freshly appended event,
/// and a rebuild resets every projection and replays from scratch.
///
/// When a projection fails on an event (corrupt payload, missing summary
/// row), that event's order is quarantined: its later events are skipped so
/// the failure is not amplified, while every other order keeps flowing. A
/// rebuild lifts all quarantines.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    quarantined: RwLock<HashSet<OrderId>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// A processor over `store` with nothing registered yet.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            quarantined: RwLock::new(HashSet::new()),
        }
    }

    /// Adds a projection to the delivery fan-out.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Whether an order's events are currently being skipped.
    pub async fn is_quarantined(&self, order_id: &OrderId) -> bool {
        self.quarantined.read().await.contains(order_id)
    }

    /// Orders currently quarantined, in no particular order.
    pub async fn quarantined_orders(&self) -> Vec<OrderId> {
        self.quarantined.read().await.iter().cloned().collect()
    }

    async fn quarantine(&self, event: &EventEnvelope, projection: &str, error: &ProjectionError) {
        tracing::error!(
            order_id = %event.order_id,
            event_type = %event.event_type,
            projection,
            %error,
            "projection failed; halting processing for this order"
        );
        metrics::counter!("projection_failures_total").increment(1);
        self.quarantined
            .write()
            .await
            .insert(event.order_id.clone());
    }

    /// Replays the whole log, delivering each event to every projection
    /// whose position says it has not seen it yet.
    #[tracing::instrument(skip(self))]
    pub async fn catch_up(&self) -> Result<()> {
        let mut stream = self.store.stream_all_events().await?;
        let mut log_index: u64 = 0;

        'events: while let Some(result) = stream.next().await {
            let event = result?;
            log_index += 1;

            if self.is_quarantined(&event.order_id).await {
                continue;
            }

            for projection in &self.projections {
                let pos = projection.position().await;
                if pos.events_seen < log_index {
                    if let Err(error) = projection.handle(&event).await {
                        self.quarantine(&event, projection.name(), &error).await;
                        continue 'events;
                    }
                    metrics::counter!("projection_events_processed_total").increment(1);
                }
            }
        }

        tracing::info!(events = log_index, "catch-up finished");

        Ok(())
    }

    /// Hands one freshly appended event to every projection.
    ///
    /// Events for quarantined orders are silently skipped. A fresh failure
    /// quarantines the order and is returned to the caller.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type, order_id = %event.order_id))]
    pub async fn deliver(&self, event: &EventEnvelope) -> Result<()> {
        if self.is_quarantined(&event.order_id).await {
            tracing::debug!("skipping event for quarantined order");
            return Ok(());
        }

        for projection in &self.projections {
            if let Err(error) = projection.handle(event).await {
                self.quarantine(event, projection.name(), &error).await;
                return Err(error);
            }
            metrics::counter!("projection_events_processed_total").increment(1);
        }
        Ok(())
    }

    /// Resets every projection, lifts quarantines and replays the log.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<()> {
        self.quarantined.write().await.clear();
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.catch_up().await
    }
}

/// Synchronous wiring: appended events are handed straight to the processor
/// before the command returns. Used by tests and single-process setups that
/// want read-your-writes behavior.
#[async_trait]
impl<S: EventStore> EventPublisher for ProjectionProcessor<S> {
    async fn publish(&self, events: &[EventEnvelope]) -> event_store::Result<()> {
        for event in events {
            self.deliver(event)
                .await
                .map_err(|error| EventStoreError::Publish(error.to_string()))?;
        }
        Ok(())
    }
}
