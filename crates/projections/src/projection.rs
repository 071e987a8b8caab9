//! The projection contract and position tracking.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// Count of events a projection has consumed.
///
/// During catch-up the processor compares this against its running event
/// index and skips events the projection has already seen, which keeps
/// repeated catch-up runs cheap. The position is an optimization only:
/// correctness under redelivery comes from handlers being idempotent,
/// never from position arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Events folded in so far.
    pub events_seen: u64,
}

impl ProjectionPosition {
    /// Position before any event has been seen.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Records one more consumed event.
    pub fn advance(&mut self) {
        self.events_seen += 1;
    }
}

/// A projection that folds events into a read model.
///
/// Projections are the query side of the system: they turn the append-only
/// event log into denormalized rows shaped for reads. Handling must be a
/// deterministic function of event content so redelivery is harmless.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Name used in logs and quarantine reports.
    fn name(&self) -> &'static str;

    /// Folds one event into the read model and advances the position.
    ///
    /// An error from here is treated as fatal for the event's order: the
    /// processor quarantines the order rather than retrying.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// How many events this projection has consumed.
    async fn position(&self) -> ProjectionPosition;

    /// Drops all derived state and rewinds the position to zero.
    async fn reset(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_single_steps() {
        let mut pos = ProjectionPosition::zero();
        assert_eq!(pos.events_seen, 0);

        for expected in 1..=5 {
            pos.advance();
            assert_eq!(pos.events_seen, expected);
        }
    }

    #[test]
    fn zero_equals_default() {
        assert_eq!(ProjectionPosition::zero(), ProjectionPosition::default());
    }
}
