//! Aggregate and domain-event traits.
//!
//! An aggregate here is never persisted: it is folded into existence from
//! its event history, asked to validate one command, and dropped. The two
//! traits below pin down that contract — events are serializable facts with
//! a stable type name, and aggregates are pure fold state over them.

use common::OrderId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact that happened in the domain.
///
/// Events are immutable once emitted and are the sole source of truth for
/// aggregate state. `event_type` is the stable name stored alongside the
/// payload and used for filtering; it must never change for a variant that
/// has already been persisted.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Stable type name of this event variant.
    fn event_type(&self) -> &'static str;
}

/// State reconstructed by folding an event history.
///
/// Implementations split their behavior in two halves that must never mix:
/// command methods inspect current state and return new events (or a domain
/// error) without mutating anything, while [`apply`](Aggregate::apply)
/// mutates state from an event and is total — replay of a stored history
/// has no legitimate failure path.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// Event type this aggregate emits and folds.
    type Event: DomainEvent;

    /// Error type produced by rejected commands.
    type Error: std::error::Error + Send + Sync;

    /// Name of the aggregate kind, for logging and error messages.
    fn aggregate_type() -> &'static str;

    /// Identity, or `None` before the creation event has been applied.
    fn id(&self) -> Option<&OrderId>;

    /// Version reached by the last applied event (0 for a fresh instance).
    fn version(&self) -> Version;

    /// Overwrites the version. The dispatcher calls this after a load or a
    /// successful append; `apply` itself never touches the version.
    fn set_version(&mut self, version: Version);

    /// Folds one event into the state.
    ///
    /// Must be deterministic and side-effect free: the same state and event
    /// always produce the same next state, on every replay.
    fn apply(&mut self, event: Self::Event);

    /// Folds a sequence of events in order.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
