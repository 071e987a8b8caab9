use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

#[derive(Default)]
struct Inner {
    /// Every event, in append order. This is the order `stream_all_events`
    /// replays, so per-order causal order holds without sorting.
    log: Vec<EventEnvelope>,
    /// Current stream version per order, so appends do not scan the log.
    heads: HashMap<OrderId, Version>,
}

/// In-memory event log backing unit tests and the default server wiring.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events held.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }

    /// Drops every event and version head.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.log.clear();
        inner.heads.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)
            .map_err(|e| EventStoreError::InvalidAppend(e.message))?;

        let order_id = events[0].order_id.clone();
        let mut inner = self.inner.write().await;

        let current = inner
            .heads
            .get(&order_id)
            .copied()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual: current,
            });
        }

        // Version reuse trips a conflict even without an expected version,
        // mirroring the unique constraint in the PostgreSQL store.
        if events[0].version <= current && current != Version::initial() {
            return Err(EventStoreError::ConcurrencyConflict {
                order_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        let last_version = events.last().map(|e| e.version).unwrap_or(current);
        inner.heads.insert(order_id, last_version);
        inner.log.extend(events);

        Ok(last_version)
    }

    async fn events_for_order(&self, order_id: &OrderId) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .log
            .iter()
            .filter(|e| &e.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let snapshot = self.inner.read().await.log.clone();
        Ok(Box::pin(stream::iter(snapshot.into_iter().map(Ok))))
    }

    async fn order_version(&self, order_id: &OrderId) -> Result<Option<Version>> {
        Ok(self.inner.read().await.heads.get(order_id).copied())
    }
}
