use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{validate_batch, EventStore, EventStoreError};
use crate::event_sourcing::core::{DomainEvent, EventEnvelope};
use crate::health::{ComponentHealth, HealthCheckable, HealthStatus};

/// Event store kept entirely in process memory
pub struct InMemoryEventStore<E: DomainEvent> {
    aggregate_type_name: String,
    streams: RwLock<HashMap<Uuid, Vec<EventEnvelope<E>>>>,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> InMemoryEventStore<E> {
    pub fn new(aggregate_type_name: &str) -> Self {
        Self {
            aggregate_type_name: aggregate_type_name.to_string(),
            streams: RwLock::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }

    /// Number of events across all aggregates
    #[cfg(test)]
    pub(crate) async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for InMemoryEventStore<E> {
    fn aggregate_type(&self) -> &str {
        &self.aggregate_type_name
    }

    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>, EventStoreError> {
        let streams = self.streams.read().await;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError> {
        validate_batch(aggregate_id, expected_version, &events)?;

        // Write lock held across check and insert keeps the append atomic
        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();

        let current_version = stream.last().map(|e| e.sequence_number).unwrap_or(0);
        if current_version != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current_version,
            });
        }

        let event_count = events.len();
        stream.extend(events);
        let new_version = expected_version + event_count as i64;

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            new_version = new_version,
            event_count = event_count,
            "Appended events to in-memory store"
        );

        Ok(new_version)
    }
}

#[async_trait]
impl<E: DomainEvent> HealthCheckable for InMemoryEventStore<E> {
    fn component_name(&self) -> &str {
        "memory_event_store"
    }

    async fn check_health(&self) -> ComponentHealth {
        ComponentHealth::new(self.component_name(), HealthStatus::Healthy)
    }
}
