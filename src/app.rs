use std::sync::Arc;

use crate::config::{Backend, Config};
use crate::db;
use crate::domain::account::{AccountEvent, BankAccount, BankAccountView};
use crate::event_sourcing::core::Aggregate;
use crate::event_sourcing::query::{
    GenericQuery, InMemoryViewRepository, LoggingQueryProcessor, PostgresViewRepository,
    QueryProcessor, ViewRepository,
};
use crate::event_sourcing::store::{
    EventStore, EventStoreDbStore, InMemoryEventStore, PostgresEventStore,
};
use crate::event_sourcing::CqrsFramework;
use crate::health::{HealthCheckable, SystemHealth};
use crate::metrics::Metrics;

// ============================================================================
// Application Wiring
// ============================================================================
//
// Picks the event store backend from config and assembles:
//   CqrsFramework<BankAccount> → [LoggingQueryProcessor, account view query]
//
// ============================================================================

pub type AccountCqrs = CqrsFramework<BankAccount>;
pub type AccountQuery = GenericQuery<BankAccount, BankAccountView>;

const VIEW_TABLE: &str = "account_query";
const VIEW_QUERY_NAME: &str = "account_query";

pub struct AppState {
    pub cqrs: Arc<AccountCqrs>,
    pub account_query: Arc<AccountQuery>,
    pub metrics: Arc<Metrics>,
    pub health_components: Vec<Arc<dyn HealthCheckable>>,
    eventstoredb: Option<Arc<EventStoreDbStore<AccountEvent>>>,
}

impl AppState {
    /// Everything in process memory; nothing survives a restart
    pub fn in_memory(metrics: Arc<Metrics>) -> Self {
        let store = Arc::new(InMemoryEventStore::<AccountEvent>::new(BankAccount::aggregate_type()));
        let views = Arc::new(InMemoryViewRepository::<BankAccountView>::new());

        let health: Vec<Arc<dyn HealthCheckable>> = vec![store.clone(), views.clone()];
        Self::assemble(store, views, metrics, health, None)
    }

    pub async fn from_config(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        tracing::info!(backend = ?config.backend, "Building application state");

        match config.backend {
            Backend::Memory => Ok(Self::in_memory(metrics)),
            Backend::Postgres => {
                let pool = db::connect_postgres(config).await?;
                db::ensure_schema(&pool).await?;

                let store = Arc::new(PostgresEventStore::<AccountEvent>::new(
                    pool.clone(),
                    BankAccount::aggregate_type(),
                ));
                let views = Arc::new(PostgresViewRepository::<BankAccountView>::new(pool, VIEW_TABLE));

                let health: Vec<Arc<dyn HealthCheckable>> = vec![store.clone(), views.clone()];
                Ok(Self::assemble(store, views, metrics, health, None))
            }
            Backend::Eventstoredb => {
                let pool = db::connect_postgres(config).await?;
                db::ensure_schema(&pool).await?;
                let client = db::connect_eventstore(&config.eventstore_url)?;

                let store = Arc::new(EventStoreDbStore::<AccountEvent>::new(
                    client,
                    BankAccount::aggregate_type(),
                ));
                let views = Arc::new(PostgresViewRepository::<BankAccountView>::new(pool, VIEW_TABLE));

                let health: Vec<Arc<dyn HealthCheckable>> = vec![store.clone(), views.clone()];
                Ok(Self::assemble(store.clone(), views, metrics, health, Some(store)))
            }
        }
    }

    fn assemble(
        store: Arc<dyn EventStore<AccountEvent>>,
        views: Arc<dyn ViewRepository<BankAccountView>>,
        metrics: Arc<Metrics>,
        health_components: Vec<Arc<dyn HealthCheckable>>,
        eventstoredb: Option<Arc<EventStoreDbStore<AccountEvent>>>,
    ) -> Self {
        let account_query = Arc::new(AccountQuery::new(VIEW_QUERY_NAME, views, store.clone()));
        let queries: Vec<Arc<dyn QueryProcessor<BankAccount>>> =
            vec![Arc::new(LoggingQueryProcessor), account_query.clone()];

        let cqrs = CqrsFramework::new(store, queries).with_metrics(metrics.clone());

        Self {
            cqrs: Arc::new(cqrs),
            account_query,
            metrics,
            health_components,
            eventstoredb,
        }
    }

    /// Poll every backend concurrently
    pub async fn system_health(&self) -> SystemHealth {
        let checks = self.health_components.iter().map(|c| c.check_health());
        let components = futures_util::future::join_all(checks).await;

        let health = SystemHealth::from_components(components);
        if !health.overall.is_healthy() {
            tracing::warn!(overall = ?health.overall, "System health degraded");
        }
        health
    }

    /// Copy point-in-time state (breaker positions) into gauges before a scrape
    pub async fn refresh_gauges(&self) {
        if let Some(store) = &self.eventstoredb {
            let breaker = store.breaker();
            self.metrics.set_circuit_state(breaker.name(), breaker.state().await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountCommand, Money};
    use crate::utils::CircuitState;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_in_memory_state_updates_view() {
        let state = AppState::in_memory(Arc::new(Metrics::new().unwrap()));
        let id = Uuid::new_v4();

        state.cqrs.execute(id, AccountCommand::OpenAccount { account_id: id }).await.unwrap();
        state
            .cqrs
            .execute(id, AccountCommand::DepositMoney { amount: Money::from_cents(1500) })
            .await
            .unwrap();

        let view = state.account_query.load(id).await.unwrap().unwrap();
        assert_eq!(view.balance, Money::from_cents(1500));
    }

    #[tokio::test]
    async fn test_refresh_gauges_reports_breaker_by_name() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let client = db::connect_eventstore(crate::config::DEFAULT_EVENTSTORE_URL).unwrap();
        let store = Arc::new(EventStoreDbStore::<AccountEvent>::new(
            client,
            BankAccount::aggregate_type(),
        ));
        let views = Arc::new(InMemoryViewRepository::<BankAccountView>::new());
        let state = AppState::assemble(store.clone(), views, metrics.clone(), vec![], Some(store));

        assert!(!metrics.render().unwrap().contains("circuit_breaker_state{"));
        state.refresh_gauges().await;

        let text = metrics.render().unwrap();
        assert!(text.contains(&format!(
            "circuit_breaker_state{{component=\"eventstoredb\"}} {}",
            CircuitState::Closed.as_gauge()
        )));
    }

    #[tokio::test]
    async fn test_in_memory_state_is_healthy() {
        let state = AppState::in_memory(Arc::new(Metrics::new().unwrap()));
        let health = state.system_health().await;

        assert!(health.overall.is_healthy());
        assert_eq!(health.components.len(), 2);
    }
}
