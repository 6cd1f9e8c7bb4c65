use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{QueryProcessor, View, ViewRepository};
use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use crate::event_sourcing::store::EventStore;

/// Logs every committed event with its pretty-printed payload
pub struct LoggingQueryProcessor;

#[async_trait]
impl<A: Aggregate> QueryProcessor<A> for LoggingQueryProcessor {
    fn name(&self) -> &str {
        "logging"
    }

    async fn dispatch(
        &self,
        aggregate_id: Uuid,
        events: &[EventEnvelope<A::Event>],
    ) -> anyhow::Result<()> {
        for event in events {
            let payload = serde_json::to_string_pretty(&event.event_data)?;
            tracing::info!(
                aggregate_type = A::aggregate_type(),
                aggregate_id = %aggregate_id,
                sequence = event.sequence_number,
                event_type = %event.event_type,
                "{}-{}\n{}",
                aggregate_id,
                event.sequence_number,
                payload
            );
        }
        Ok(())
    }
}

/// How often a view update is recomputed after losing a save race
const MAX_SAVE_ATTEMPTS: u32 = 5;

/// Keeps a persisted view of type `V` in step with the event stream.
///
/// Updates for one aggregate are serialized in-process, and the repository
/// save is conditional on the loaded version so writers in other processes
/// cannot overwrite each other. When the delivered events do not start right
/// after the view's version (a later command was dispatched first), the
/// missing events are read back from the event store.
pub struct GenericQuery<A, V>
where
    A: Aggregate,
    V: View<A>,
{
    name: String,
    repository: Arc<dyn ViewRepository<V>>,
    events: Arc<dyn EventStore<A::Event>>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<A, V> GenericQuery<A, V>
where
    A: Aggregate,
    V: View<A>,
{
    pub fn new(
        name: impl Into<String>,
        repository: Arc<dyn ViewRepository<V>>,
        events: Arc<dyn EventStore<A::Event>>,
    ) -> Self {
        Self {
            name: name.into(),
            repository,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, view_id: Uuid) -> anyhow::Result<Option<V>> {
        Ok(self.repository.load(view_id).await?.map(|(view, _)| view))
    }

    async fn lock_for(&self, aggregate_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.lock().await.entry(aggregate_id).or_default().clone()
    }

    /// Drop the aggregate's lock once nobody else holds or waits on it
    async fn release(&self, aggregate_id: Uuid, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(&aggregate_id);
        }
    }

    /// Events after `applied_up_to`, contiguous from `applied_up_to + 1`
    async fn pending_events(
        &self,
        aggregate_id: Uuid,
        applied_up_to: i64,
        delivered: &[EventEnvelope<A::Event>],
    ) -> anyhow::Result<Vec<EventEnvelope<A::Event>>> {
        let unseen: Vec<_> = delivered
            .iter()
            .filter(|e| e.sequence_number > applied_up_to)
            .cloned()
            .collect();

        match unseen.first() {
            Some(first) if first.sequence_number > applied_up_to + 1 => {
                tracing::debug!(
                    query = %self.name,
                    aggregate_id = %aggregate_id,
                    view_version = applied_up_to,
                    first_delivered = first.sequence_number,
                    "View is behind the delivered events, catching up from the event store"
                );
                let history = self.events.load_events(aggregate_id).await?;
                Ok(history
                    .into_iter()
                    .filter(|e| e.sequence_number > applied_up_to)
                    .collect())
            }
            _ => Ok(unseen),
        }
    }

    async fn update_view(
        &self,
        aggregate_id: Uuid,
        events: &[EventEnvelope<A::Event>],
    ) -> anyhow::Result<()> {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let (mut view, loaded_version) = self
                .repository
                .load(aggregate_id)
                .await?
                .unwrap_or_else(|| (V::default(), 0));

            let pending = self.pending_events(aggregate_id, loaded_version, events).await?;
            let Some(last) = pending.last() else {
                tracing::debug!(query = %self.name, aggregate_id = %aggregate_id, "No new events for view");
                return Ok(());
            };
            let version = last.sequence_number;

            for event in &pending {
                view.update(event);
            }

            if self
                .repository
                .save(aggregate_id, &view, loaded_version, version)
                .await?
            {
                tracing::debug!(
                    query = %self.name,
                    aggregate_id = %aggregate_id,
                    applied = pending.len(),
                    version = version,
                    "View updated"
                );
                return Ok(());
            }

            tracing::warn!(
                query = %self.name,
                aggregate_id = %aggregate_id,
                attempt = attempt,
                loaded_version = loaded_version,
                "View changed while updating, reloading"
            );
        }

        anyhow::bail!(
            "view {} for {} kept changing after {} attempts",
            self.name,
            aggregate_id,
            MAX_SAVE_ATTEMPTS
        )
    }
}

#[async_trait]
impl<A, V> QueryProcessor<A> for GenericQuery<A, V>
where
    A: Aggregate,
    V: View<A>,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn dispatch(
        &self,
        aggregate_id: Uuid,
        events: &[EventEnvelope<A::Event>],
    ) -> anyhow::Result<()> {
        let lock = self.lock_for(aggregate_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.update_view(aggregate_id, events).await
        };
        self.release(aggregate_id, lock).await;
        result
    }
}
