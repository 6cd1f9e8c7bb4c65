use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventstore::{
    AppendToStreamOptions, Client, EventData, ExpectedRevision, ReadStreamOptions, ResolvedEvent,
    StreamPosition,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use uuid::Uuid;

use super::{validate_batch, EventStore, EventStoreError};
use crate::event_sourcing::core::{DomainEvent, EventEnvelope};
use crate::health::{ComponentHealth, HealthCheckable, HealthStatus};
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

// ============================================================================
// EventStoreDB Event Store
// ============================================================================
//
// One stream per aggregate, named `{aggregate_type}-{aggregate_id}`.
// Stream revisions are 0-based, envelope sequence numbers 1-based:
//   sequence = revision + 1
// Envelope metadata that has no native EventStoreDB slot travels as the
// event's custom JSON metadata.
//
// ============================================================================

const HEALTH_PROBE_STREAM: &str = "bank-es-health-probe";

#[derive(Serialize, Deserialize)]
struct StoredMetadata {
    aggregate_id: Uuid,
    event_version: i32,
    causation_id: Option<Uuid>,
    correlation_id: Uuid,
    user_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

enum AppendOutcome {
    Written,
    WrongExpectedVersion,
}

pub struct EventStoreDbStore<E: DomainEvent> {
    client: Client,
    aggregate_type_name: String,
    breaker: CircuitBreaker,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> EventStoreDbStore<E> {
    pub fn new(client: Client, aggregate_type_name: &str) -> Self {
        Self::with_breaker(client, aggregate_type_name, CircuitBreakerConfig::default())
    }

    pub fn with_breaker(client: Client, aggregate_type_name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            client,
            aggregate_type_name: aggregate_type_name.to_string(),
            breaker: CircuitBreaker::new("eventstoredb", config),
            _phantom: PhantomData,
        }
    }

    pub fn stream_name(&self, aggregate_id: Uuid) -> String {
        stream_name(&self.aggregate_type_name, aggregate_id)
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Route a backend call through the circuit breaker. Only transport-level
    /// failures should surface as `Err` from `operation`.
    async fn guarded<T, Fut>(&self, operation: Fut) -> Result<T, EventStoreError>
    where
        Fut: Future<Output = Result<T, EventStoreError>>,
    {
        match self.breaker.call(operation).await {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen(name)) => Err(EventStoreError::Unavailable(name)),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }

    async fn read_all(&self, stream: &str) -> Result<Vec<ResolvedEvent>, EventStoreError> {
        let options = ReadStreamOptions::default()
            .position(StreamPosition::Start)
            .forwards();

        let mut reader = match self.client.read_stream(stream, &options).await {
            Ok(reader) => reader,
            Err(eventstore::Error::ResourceNotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut resolved = Vec::new();
        loop {
            match reader.next().await {
                Ok(Some(event)) => resolved.push(event),
                Ok(None) => break,
                Err(eventstore::Error::ResourceNotFound) => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(resolved)
    }

    fn decode(&self, resolved: &ResolvedEvent) -> Result<EventEnvelope<E>, EventStoreError> {
        let recorded = resolved.get_original_event();
        let event_data: E = recorded.as_json()?;
        let stored: StoredMetadata = serde_json::from_slice(&recorded.custom_metadata)?;

        Ok(EventEnvelope {
            event_id: recorded.id,
            aggregate_id: stored.aggregate_id,
            aggregate_type: self.aggregate_type_name.clone(),
            sequence_number: recorded.revision as i64 + 1,
            event_type: recorded.event_type.clone(),
            event_version: stored.event_version,
            event_data,
            causation_id: stored.causation_id,
            correlation_id: stored.correlation_id,
            user_id: stored.user_id,
            timestamp: stored.timestamp,
            metadata: stored.metadata,
        })
    }

    fn encode(envelope: &EventEnvelope<E>) -> Result<EventData, EventStoreError> {
        let stored = StoredMetadata {
            aggregate_id: envelope.aggregate_id,
            event_version: envelope.event_version,
            causation_id: envelope.causation_id,
            correlation_id: envelope.correlation_id,
            user_id: envelope.user_id,
            timestamp: envelope.timestamp,
            metadata: envelope.metadata.clone(),
        };

        let data = EventData::json(envelope.event_type.as_str(), &envelope.event_data)?
            .id(envelope.event_id)
            .metadata_as_json(&stored)?;

        Ok(data)
    }
}

pub(crate) fn stream_name(aggregate_type: &str, aggregate_id: Uuid) -> String {
    format!("{}-{}", aggregate_type, aggregate_id)
}

/// Expected stream revision for a 1-based aggregate version
pub(crate) fn expected_revision(expected_version: i64) -> ExpectedRevision {
    if expected_version <= 0 {
        ExpectedRevision::NoStream
    } else {
        ExpectedRevision::Exact((expected_version - 1) as u64)
    }
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for EventStoreDbStore<E> {
    fn aggregate_type(&self) -> &str {
        &self.aggregate_type_name
    }

    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>, EventStoreError> {
        let stream = self.stream_name(aggregate_id);
        let resolved = self.guarded(self.read_all(&stream)).await?;

        let events = resolved
            .iter()
            .map(|event| self.decode(event))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            stream = %stream,
            event_count = events.len(),
            "Loaded events from EventStoreDB"
        );

        Ok(events)
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError> {
        validate_batch(aggregate_id, expected_version, &events)?;

        let stream = self.stream_name(aggregate_id);
        let batch = events
            .iter()
            .map(Self::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let options = AppendToStreamOptions::default().expected_revision(expected_revision(expected_version));

        let outcome = self
            .guarded(async {
                match self.client.append_to_stream(stream.as_str(), &options, batch).await {
                    Ok(_) => Ok(AppendOutcome::Written),
                    Err(eventstore::Error::WrongExpectedVersion { .. }) => {
                        Ok(AppendOutcome::WrongExpectedVersion)
                    }
                    Err(e) => Err(EventStoreError::from(e)),
                }
            })
            .await?;

        match outcome {
            AppendOutcome::Written => {
                let new_version = expected_version + events.len() as i64;
                tracing::info!(
                    stream = %stream,
                    new_version = new_version,
                    event_count = events.len(),
                    "Appended events to EventStoreDB"
                );
                Ok(new_version)
            }
            AppendOutcome::WrongExpectedVersion => {
                let actual = self.current_version(aggregate_id).await?;
                Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual,
                })
            }
        }
    }
}

#[async_trait]
impl<E: DomainEvent> HealthCheckable for EventStoreDbStore<E> {
    fn component_name(&self) -> &str {
        "eventstoredb"
    }

    async fn check_health(&self) -> ComponentHealth {
        let status = match self.breaker.state().await {
            CircuitState::Open => HealthStatus::Unhealthy("circuit breaker open".to_string()),
            CircuitState::HalfOpen => HealthStatus::Degraded("circuit breaker half-open".to_string()),
            CircuitState::Closed => match self.guarded(self.read_all(HEALTH_PROBE_STREAM)).await {
                Ok(_) => HealthStatus::Healthy,
                Err(e) => HealthStatus::Unhealthy(e.to_string()),
            },
        };
        ComponentHealth::new(self.component_name(), status)
    }
}
