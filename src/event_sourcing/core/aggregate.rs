use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::event::{DomainEvent, EventEnvelope};
use crate::event_sourcing::store::EventStoreError;

// ============================================================================
// Aggregate Root Pattern
// ============================================================================
//
// State is derived from events only. Commands are validated against the
// current state and either rejected or turned into new events.
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// `handle` must stay free of I/O; `apply` must accept any event previously
/// emitted by `handle`.
pub trait Aggregate: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Event: DomainEvent;
    type Command: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Unique name of this aggregate kind, used for stream and table keys
    fn aggregate_type() -> &'static str;

    /// Handle command and emit events (business logic)
    fn handle(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Apply an event to update state
    fn apply(&mut self, event: &Self::Event);
}

/// An aggregate together with its identity and the version it was loaded at
#[derive(Debug, Clone)]
pub struct AggregateContext<A> {
    pub aggregate_id: Uuid,
    pub aggregate: A,
    pub version: i64,
}

impl<A: Aggregate> AggregateContext<A> {
    /// Fresh aggregate with no history
    pub fn empty(aggregate_id: Uuid) -> Self {
        Self {
            aggregate_id,
            aggregate: A::default(),
            version: 0,
        }
    }

    /// Reconstruct aggregate state from its event history
    pub fn rebuild(
        aggregate_id: Uuid,
        events: &[EventEnvelope<A::Event>],
    ) -> Result<Self, EventStoreError> {
        let mut context = Self::empty(aggregate_id);

        for envelope in events {
            if envelope.aggregate_id != aggregate_id {
                return Err(EventStoreError::AggregateMismatch {
                    expected: aggregate_id,
                    found: envelope.aggregate_id,
                });
            }

            let expected_sequence = context.version + 1;
            if envelope.sequence_number != expected_sequence {
                return Err(EventStoreError::SequenceGap {
                    aggregate_id,
                    expected: expected_sequence,
                    found: envelope.sequence_number,
                });
            }

            context.aggregate.apply(&envelope.event_data);
            context.version = envelope.sequence_number;
        }

        Ok(context)
    }

    pub fn exists(&self) -> bool {
        self.version > 0
    }
}
