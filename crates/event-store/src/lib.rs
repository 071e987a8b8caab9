//! Append-only event log for the order management system.
//!
//! The log is the single source of truth: order state is always derived by
//! replaying events, never stored directly. Provides the `EventStore` trait
//! with in-memory and PostgreSQL implementations, plus the `EventPublisher`
//! trait through which appended events reach the projection side.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod publisher;
pub mod store;

pub use common::OrderId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use publisher::{EventPublisher, NullPublisher};
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
