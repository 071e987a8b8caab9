//! Stored-event types: stream versions, event ids and the envelope.
//!
//! The envelope carries the domain payload as raw JSON so this crate stays
//! independent of the domain types; the projection side deserializes the
//! payload back into its own event enum.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of an event within one order's stream.
///
/// The first event of an order has version 1; each append advances the
/// stream by exactly one. Version 0 means "no events yet" and is what
/// `AppendOptions::expect_new` checks against. The optimistic-concurrency
/// contract compares these values, nothing else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Wraps a raw version value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of an order with no events yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version assigned to the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Version of the event following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw value, for SQL binds and response bodies.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Globally unique identifier of one stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Mints a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an id read back from storage.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID, for SQL binds.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        EventId::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One stored event: the domain payload plus the log's bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique id of this event.
    pub event_id: EventId,

    /// Variant name, e.g. `"OrderCreated"`.
    pub event_type: String,

    /// Order whose stream this event belongs to.
    pub order_id: OrderId,

    /// Stream position after this event.
    pub version: Version,

    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,

    /// Domain payload as JSON.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Starts building an envelope. `event_id` and `timestamp` default to a
    /// fresh id and the current time when not set.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }
}

/// Builder for [`EventEnvelope`].
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    order_id: Option<OrderId>,
    version: Option<Version>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl EventEnvelopeBuilder {
    /// Sets the owning order.
    pub fn order_id(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    /// Names the event variant, e.g. `"ItemAdded"`.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Positions the event in its order's stream.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Serializes a domain value into the payload slot.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Stores an already-built JSON payload.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Overrides the minted event id. Only storage round-trips need this.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Overrides the recorded-at timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds the envelope.
    ///
    /// # Panics
    ///
    /// Panics when event_type, order_id, version or payload were not set.
    pub fn build(self) -> EventEnvelope {
        EventEnvelope {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self.event_type.expect("event_type is required"),
            order_id: self.order_id.expect("order_id is required"),
            version: self.version.expect("version is required"),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: self.payload.expect("payload is required"),
        }
    }
}
