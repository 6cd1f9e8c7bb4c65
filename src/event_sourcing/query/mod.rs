// ============================================================================
// Query Side - Read Models
// ============================================================================
//
// Query processors receive the envelopes of every committed command and keep
// read models (views) up to date. Views are versioned by the last sequence
// number they applied, so redelivered events are skipped. A save only lands
// if the stored version is still the one that was loaded; the loser of a
// race reloads and re-applies.
//
// ============================================================================

mod processors;
mod repository;

pub use processors::{GenericQuery, LoggingQueryProcessor};
pub use repository::{InMemoryViewRepository, PostgresViewRepository};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, EventEnvelope};

/// Receives committed events for an aggregate type
#[async_trait]
pub trait QueryProcessor<A: Aggregate>: Send + Sync {
    fn name(&self) -> &str;

    async fn dispatch(
        &self,
        aggregate_id: Uuid,
        events: &[EventEnvelope<A::Event>],
    ) -> anyhow::Result<()>;
}

/// A read model folded from an aggregate's events
pub trait View<A: Aggregate>: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn update(&mut self, event: &EventEnvelope<A::Event>);
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("View serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for views, keyed by aggregate id
#[async_trait]
pub trait ViewRepository<V>: Send + Sync
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    /// Returns the view and the last sequence number it reflects
    async fn load(&self, view_id: Uuid) -> Result<Option<(V, i64)>, ViewError>;

    /// Store `view` at `version` if the stored version is still
    /// `expected_version` (0 when no view exists yet). Returns `false` when
    /// another writer saved first.
    async fn save(
        &self,
        view_id: Uuid,
        view: &V,
        expected_version: i64,
        version: i64,
    ) -> Result<bool, ViewError>;
}
