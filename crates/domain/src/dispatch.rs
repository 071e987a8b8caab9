//! Command dispatch infrastructure.
//!
//! The dispatcher is the only component that reads from and appends to the
//! event log: it serializes commands per order id, reconstructs the
//! aggregate by replay, appends the produced events under an optimistic
//! version check, and publishes them for projection.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use common::OrderId;
use event_store::{
    AppendOptions, EventEnvelope, EventPublisher, EventStore, EventStoreError, Version,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// What a successfully dispatched command hands back to the caller.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// Aggregate state with the new events already applied.
    pub aggregate: A,

    /// Events the command produced, in append order.
    pub events: Vec<A::Event>,

    /// Head version of the order after the append.
    pub new_version: Version,
}

/// A request to change one order.
///
/// Implementations carry the caller's input; whether the change is allowed
/// is decided against the replayed aggregate at execution time.
pub trait Command: Send + Sync {
    /// Aggregate kind the command operates on.
    type Aggregate: Aggregate;

    /// Order the command is addressed to. Also selects the execution slot.
    fn order_id(&self) -> &OrderId;
}

/// Retry policy for commands that hit an optimistic-concurrency conflict.
///
/// Conflicts are the only retried failure: validation and state errors are
/// deterministic and retrying them cannot change the outcome.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Disables retries: every conflict is returned to the caller.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.base_delay.mul_f64(factor)
    }
}

/// Configuration for the command dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long a command may wait for its per-order execution slot before
    /// failing with a timeout.
    pub slot_timeout: Duration,

    /// Retry policy for concurrency conflicts.
    pub retry: RetryConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            slot_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

/// Runs commands against replayed aggregates.
///
/// One dispatch is: take the order's execution slot, replay the aggregate,
/// ask the command for events, append them under the version the replay
/// observed, then hand the appended envelopes to the publisher. Commands
/// addressed to different orders proceed in parallel.
pub struct CommandDispatcher<S, P, A>
where
    S: EventStore,
    P: EventPublisher,
    A: Aggregate,
{
    store: S,
    publisher: P,
    config: DispatcherConfig,
    slots: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
    _phantom: PhantomData<A>,
}

impl<S, P, A> CommandDispatcher<S, P, A>
where
    S: EventStore,
    P: EventPublisher,
    A: Aggregate,
{
    /// Creates a new dispatcher with the default configuration.
    pub fn new(store: S, publisher: P) -> Self {
        Self::with_config(store, publisher, DispatcherConfig::default())
    }

    /// Creates a new dispatcher with an explicit configuration.
    pub fn with_config(store: S, publisher: P, config: DispatcherConfig) -> Self {
        Self {
            store,
            publisher,
            config,
            slots: Mutex::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }

    /// Read access to the event store backing this dispatcher.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an order's aggregate by replaying its event history.
    ///
    /// An order with no history replays to the default (absent) aggregate.
    pub async fn load(&self, order_id: &OrderId) -> Result<A, DomainError> {
        let mut aggregate = A::default();
        for record in self.store.events_for_order(order_id).await? {
            aggregate.apply(serde_json::from_value(record.payload)?);
            aggregate.set_version(record.version);
        }
        Ok(aggregate)
    }

    /// Like [`load`](Self::load), but maps the absent aggregate to `None`.
    pub async fn load_existing(&self, order_id: &OrderId) -> Result<Option<A>, DomainError> {
        match self.load(order_id).await? {
            aggregate if aggregate.id().is_some() => Ok(Some(aggregate)),
            _ => Ok(None),
        }
    }

    /// Executes a command against an existing aggregate.
    ///
    /// Fails with [`DomainError::NotFound`] when the order has no events.
    /// Concurrency conflicts are retried per the configured policy, with the
    /// aggregate reloaded before each attempt.
    pub async fn execute<F>(
        &self,
        order_id: &OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let _slot = self.acquire_slot(order_id).await?;

        let mut attempt = 1;
        loop {
            match self.execute_once(order_id, &command_fn).await {
                Err(error) if error.is_retryable() && attempt < self.config.retry.max_attempts => {
                    let delay = self.config.retry.delay_for(attempt);
                    tracing::warn!(
                        order_id = %order_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "concurrency conflict, retrying command"
                    );
                    metrics::counter!("dispatcher_conflict_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Executes a creation command for an order that must not exist yet.
    ///
    /// Fails with [`DomainError::AlreadyExists`] when the order already has
    /// events, including when a concurrent creation wins the append race.
    pub async fn execute_create<F>(
        &self,
        order_id: &OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let _slot = self.acquire_slot(order_id).await?;

        if self.store.order_version(order_id).await?.is_some() {
            return Err(self.already_exists(order_id));
        }

        let mut aggregate = A::default();
        let events = command_fn(&aggregate)?;
        if events.is_empty() {
            return Ok(CommandResult { aggregate, events, new_version: Version::initial() });
        }

        let envelopes = self.build_envelopes(order_id, Version::initial(), &events)?;

        let append = self
            .store
            .append(envelopes.clone(), AppendOptions::expect_new())
            .await;
        let new_version = match append {
            Ok(version) => version,
            Err(EventStoreError::ConcurrencyConflict { .. }) => {
                return Err(self.already_exists(order_id));
            }
            Err(error) => return Err(error.into()),
        };

        Self::advance(&mut aggregate, &events, new_version);
        self.publish(order_id, &envelopes).await;

        Ok(CommandResult { aggregate, events, new_version })
    }

    async fn execute_once<F>(
        &self,
        order_id: &OrderId,
        command_fn: &F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(order_id).await?;
        if aggregate.id().is_none() {
            return Err(DomainError::NotFound {
                aggregate_type: A::aggregate_type(),
                order_id: order_id.to_string(),
            });
        }

        let loaded_version = aggregate.version();
        let events = command_fn(&aggregate)?;
        if events.is_empty() {
            // A command that decides nothing needs to change is a success.
            return Ok(CommandResult { aggregate, events, new_version: loaded_version });
        }

        let envelopes = self.build_envelopes(order_id, loaded_version, &events)?;

        let new_version = self
            .store
            .append(envelopes.clone(), AppendOptions::expect_version(loaded_version))
            .await?;

        Self::advance(&mut aggregate, &events, new_version);
        self.publish(order_id, &envelopes).await;

        Ok(CommandResult { aggregate, events, new_version })
    }

    /// Acquires the exclusive execution slot for an order.
    ///
    /// Waits up to the configured timeout, then fails with
    /// [`DomainError::Timeout`] without having touched the log.
    async fn acquire_slot(&self, order_id: &OrderId) -> Result<OwnedMutexGuard<()>, DomainError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(order_id.clone()).or_default().clone()
        };

        match tokio::time::timeout(self.config.slot_timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                metrics::counter!("dispatcher_slot_timeouts_total").increment(1);
                Err(DomainError::Timeout {
                    order_id: order_id.to_string(),
                })
            }
        }
    }

    /// Wraps new events in envelopes, numbering them consecutively after
    /// `based_on`.
    fn build_envelopes(
        &self,
        order_id: &OrderId,
        based_on: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut version = based_on;
        events
            .iter()
            .map(|event| {
                version = version.next();
                Ok(EventEnvelope::builder()
                    .order_id(order_id.clone())
                    .event_type(event.event_type())
                    .version(version)
                    .payload(event)?
                    .build())
            })
            .collect()
    }

    /// Folds freshly appended events into the aggregate and records the new
    /// head version.
    fn advance(aggregate: &mut A, events: &[A::Event], new_version: Version) {
        for event in events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);
    }

    /// Publishes appended events to the projection side.
    ///
    /// Publication failures do not fail the command: the events are already
    /// durable, so the projection catches up from the log instead.
    async fn publish(&self, order_id: &OrderId, envelopes: &[EventEnvelope]) {
        if let Err(error) = self.publisher.publish(envelopes).await {
            metrics::counter!("dispatcher_publish_failures_total").increment(1);
            tracing::error!(order_id = %order_id, %error, "failed to publish appended events");
        }
    }

    fn already_exists(&self, order_id: &OrderId) -> DomainError {
        DomainError::AlreadyExists {
            aggregate_type: A::aggregate_type(),
            order_id: order_id.to_string(),
        }
    }
}
