use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, AggregateContext, EventEnvelope};
use crate::event_sourcing::query::QueryProcessor;
use crate::event_sourcing::store::{EventStore, EventStoreError};
use crate::metrics::Metrics;
use crate::utils::{retry_when, IsTransient, RetryConfig};

// ============================================================================
// CQRS Framework - Command Pipeline
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → Queries
//
// A stale read (another writer appended in between) surfaces as a
// concurrency conflict; the whole load/handle/append cycle is then re-run
// against the fresh state. Transport failures only repeat the append, with
// the same envelopes, since the first attempt may already have committed.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CommandError<E: std::error::Error> {
    #[error(transparent)]
    Domain(E),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl<E: std::error::Error> CommandError<E> {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommandError::Store(e) if e.is_conflict())
    }
}

pub struct CqrsFramework<A: Aggregate> {
    store: Arc<dyn EventStore<A::Event>>,
    queries: Vec<Arc<dyn QueryProcessor<A>>>,
    metrics: Option<Arc<Metrics>>,
    retry: RetryConfig,
    append_retry: RetryConfig,
}

impl<A> CqrsFramework<A>
where
    A: Aggregate,
    A::Command: Clone,
{
    pub fn new(store: Arc<dyn EventStore<A::Event>>, queries: Vec<Arc<dyn QueryProcessor<A>>>) -> Self {
        Self {
            store,
            queries,
            metrics: None,
            retry: RetryConfig::concurrency(),
            append_retry: RetryConfig::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Retries of the whole command cycle after a concurrency conflict
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Retries of a single append after a transport failure
    pub fn with_append_retry(mut self, retry: RetryConfig) -> Self {
        self.append_retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn EventStore<A::Event>> {
        &self.store
    }

    /// Rebuild the aggregate from its full history
    pub async fn load(&self, aggregate_id: Uuid) -> Result<AggregateContext<A>, EventStoreError> {
        let events = self.store.load_events(aggregate_id).await?;
        AggregateContext::rebuild(aggregate_id, &events)
    }

    pub async fn execute(
        &self,
        aggregate_id: Uuid,
        command: A::Command,
    ) -> Result<i64, CommandError<A::Error>> {
        self.execute_with_metadata(aggregate_id, command, HashMap::new()).await
    }

    /// Handle a command, persist resulting events and notify query processors.
    /// Returns the aggregate version after the command.
    pub async fn execute_with_metadata(
        &self,
        aggregate_id: Uuid,
        command: A::Command,
        metadata: HashMap<String, String>,
    ) -> Result<i64, CommandError<A::Error>> {
        let started = Instant::now();
        let correlation_id = Uuid::new_v4();
        let operation = format!("{}_command", A::aggregate_type());
        let operation_name = operation.as_str();

        let result = retry_when(&self.retry, operation_name, CommandError::is_conflict, |attempt| {
            let command = command.clone();
            let metadata = metadata.clone();
            async move {
                if attempt > 1 {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_retry_attempt(operation_name);
                    }
                }
                self.try_execute(aggregate_id, command, metadata, correlation_id).await
            }
        })
        .await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => "success",
                Err(CommandError::Domain(_)) => "rejected",
                Err(CommandError::Store(_)) => "error",
            };
            metrics.record_command(A::aggregate_type(), outcome, started.elapsed().as_secs_f64());
        }

        let (version, committed) = result?;

        if !committed.is_empty() {
            self.dispatch(aggregate_id, &committed).await;
        }

        Ok(version)
    }

    async fn try_execute(
        &self,
        aggregate_id: Uuid,
        command: A::Command,
        metadata: HashMap<String, String>,
        correlation_id: Uuid,
    ) -> Result<(i64, Vec<EventEnvelope<A::Event>>), CommandError<A::Error>> {
        let context = self.load(aggregate_id).await?;
        let expected_version = context.version;

        let domain_events = context
            .aggregate
            .handle(command)
            .map_err(CommandError::Domain)?;

        if domain_events.is_empty() {
            tracing::debug!(aggregate_id = %aggregate_id, "Command produced no events");
            return Ok((expected_version, Vec::new()));
        }

        let envelopes: Vec<EventEnvelope<A::Event>> = domain_events
            .into_iter()
            .zip(expected_version + 1..)
            .map(|(event, sequence)| {
                let mut envelope = EventEnvelope::new(
                    aggregate_id,
                    A::aggregate_type(),
                    sequence,
                    event,
                    correlation_id,
                );
                envelope.metadata = metadata.clone();
                envelope
            })
            .collect();

        match self.append(aggregate_id, expected_version, &envelopes).await {
            Ok(new_version) => {
                if let Some(metrics) = &self.metrics {
                    for envelope in &envelopes {
                        metrics.record_event_appended(A::aggregate_type(), &envelope.event_type);
                    }
                }
                tracing::info!(
                    aggregate_type = A::aggregate_type(),
                    aggregate_id = %aggregate_id,
                    new_version = new_version,
                    correlation_id = %correlation_id,
                    "Command committed"
                );
                Ok((new_version, envelopes))
            }
            Err(e @ EventStoreError::ConcurrencyConflict { .. }) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_concurrency_conflict(A::aggregate_type());
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append with retries on transport failures. A conflict on a repeated
    /// attempt may be our own earlier write whose acknowledgement was lost, so
    /// the stored event ids are checked before reporting it.
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        envelopes: &[EventEnvelope<A::Event>],
    ) -> Result<i64, EventStoreError> {
        let operation = format!("{}_append", A::aggregate_type());
        let operation_name = operation.as_str();

        retry_when(
            &self.append_retry,
            operation_name,
            |e: &EventStoreError| e.is_transient() && !e.is_conflict(),
            |attempt| async move {
                if attempt > 1 {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_retry_attempt(operation_name);
                    }
                }

                match self
                    .store
                    .append_events(aggregate_id, expected_version, envelopes.to_vec())
                    .await
                {
                    Err(conflict @ EventStoreError::ConcurrencyConflict { .. }) if attempt > 1 => {
                        if !self.already_stored(aggregate_id, envelopes).await? {
                            return Err(conflict);
                        }
                        tracing::warn!(
                            aggregate_id = %aggregate_id,
                            attempt = attempt,
                            "Earlier append attempt was committed, acknowledgement was lost"
                        );
                        Ok(expected_version + envelopes.len() as i64)
                    }
                    other => other,
                }
            },
        )
        .await
    }

    async fn already_stored(
        &self,
        aggregate_id: Uuid,
        envelopes: &[EventEnvelope<A::Event>],
    ) -> Result<bool, EventStoreError> {
        let Some(first) = envelopes.first() else {
            return Ok(false);
        };
        let stored = self.store.load_events(aggregate_id).await?;
        Ok(stored.iter().any(|e| e.event_id == first.event_id))
    }

    async fn dispatch(&self, aggregate_id: Uuid, events: &[EventEnvelope<A::Event>]) {
        for query in &self.queries {
            if let Err(e) = query.dispatch(aggregate_id, events).await {
                tracing::error!(
                    query = query.name(),
                    aggregate_id = %aggregate_id,
                    error = %e,
                    "Query processor failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_query_failure(query.name());
                }
            }
        }
    }
}
