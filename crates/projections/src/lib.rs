//! Query side: projections that fold the event log into read models.
//!
//! [`OrderSummaryProjection`] maintains one denormalized [`OrderSummary`] row
//! per order in a [`ReadModelStore`]. [`ProjectionProcessor`] feeds it three
//! ways: a catch-up replay at startup, live delivery of freshly appended
//! events, and a full rebuild on demand; streams that keep failing are
//! quarantined per order. [`ChannelPublisher`] bridges the dispatcher into
//! the processor through a bounded queue.

pub mod error;
pub mod processor;
pub mod projection;
pub mod publisher;
pub mod read_model;
pub mod summary;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use publisher::ChannelPublisher;
pub use read_model::{InMemoryReadModelStore, OrderItemSummary, OrderSummary, ReadModelStore};
pub use summary::OrderSummaryProjection;
