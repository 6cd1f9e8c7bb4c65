// ============================================================================
// Event Sourcing Store - Persistence Layer
// ============================================================================
//
// One `EventStore` trait, three backends:
// - memory:       tests and throwaway runs
// - postgres:     `events` table in the relational database
// - eventstoredb: one stream per aggregate in EventStoreDB
//
// ============================================================================

mod error;
mod eventstoredb;
mod memory;
mod postgres;

pub use error::EventStoreError;
pub use eventstoredb::EventStoreDbStore;
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventEnvelope};

/// Append-only event repository for a single aggregate type
#[async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    fn aggregate_type(&self) -> &str;

    /// Load all events for an aggregate, ordered by sequence number
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>, EventStoreError>;

    /// Atomically append events if the aggregate is still at `expected_version`.
    /// Returns the new version.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError>;

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let events = self.load_events(aggregate_id).await?;
        Ok(events.last().map(|e| e.sequence_number).unwrap_or(0))
    }

    async fn aggregate_exists(&self, aggregate_id: Uuid) -> Result<bool, EventStoreError> {
        Ok(self.current_version(aggregate_id).await? > 0)
    }
}

/// Checks shared by every backend before anything is written
pub(crate) fn validate_batch<E>(
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[EventEnvelope<E>],
) -> Result<(), EventStoreError> {
    if events.is_empty() {
        return Err(EventStoreError::EmptyAppend);
    }

    for (offset, envelope) in events.iter().enumerate() {
        if envelope.aggregate_id != aggregate_id {
            return Err(EventStoreError::AggregateMismatch {
                expected: aggregate_id,
                found: envelope.aggregate_id,
            });
        }

        let expected_sequence = expected_version + offset as i64 + 1;
        if envelope.sequence_number != expected_sequence {
            return Err(EventStoreError::SequenceGap {
                aggregate_id,
                expected: expected_sequence,
                found: envelope.sequence_number,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde::{Deserialize, Serialize};

    use crate::event_sourcing::core::DomainEvent;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    pub enum NoteEvent {
        Written { text: String },
        Erased,
    }

    impl DomainEvent for NoteEvent {
        fn event_type(&self) -> &'static str {
            match self {
                NoteEvent::Written { .. } => "NoteWritten",
                NoteEvent::Erased => "NoteErased",
            }
        }
    }
}
