use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;
use crate::event_sourcing::store::EventStoreError;
use crate::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Database Connections
// ============================================================================

const SCHEMA: &str = include_str!("../db/init/01-schema.sql");

/// Connect to PostgreSQL, retrying while the server is still starting up
pub async fn connect_postgres(config: &Config) -> Result<PgPool, EventStoreError> {
    tracing::info!(url = %config.redacted_database_url(), "Connecting to PostgreSQL...");

    let pool = retry_on_transient(&RetryConfig::startup(), "postgres_connect", |_| async move {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await
            .map_err(EventStoreError::from)
    })
    .await?;

    tracing::info!("✅ Connected to PostgreSQL");
    Ok(pool)
}

/// Create tables and indexes if missing. Same script docker-compose mounts
/// into the PostgreSQL init directory.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema is up to date");
    Ok(())
}

/// Build an EventStoreDB client. The gRPC connection is established lazily
/// on the first call.
pub fn connect_eventstore(url: &str) -> anyhow::Result<eventstore::Client> {
    let settings: eventstore::ClientSettings = url.parse()?;
    let client = eventstore::Client::new(settings)?;
    tracing::info!("EventStoreDB client configured");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EVENTSTORE_URL;
    use std::collections::HashSet;
    use std::path::Path;

    const COMPOSE: &str = include_str!("../docker-compose.yml");

    fn compose() -> serde_yaml::Value {
        serde_yaml::from_str(COMPOSE).unwrap()
    }

    #[test]
    fn test_compose_host_ports_are_unique() {
        let compose = compose();
        let services = compose["services"].as_mapping().unwrap();

        let mut host_ports = HashSet::new();
        for (name, service) in services {
            for port in service["ports"].as_sequence().into_iter().flatten() {
                let mapping = port.as_str().unwrap();
                // "host:container" or "ip:host:container"
                let (host, _) = mapping.rsplit_once(':').unwrap();
                assert!(
                    host_ports.insert(host.to_string()),
                    "service {:?} reuses host port {}",
                    name,
                    host
                );
            }
        }

        let expected: HashSet<String> = ["5432", "2113", "1113"].iter().map(|p| p.to_string()).collect();
        assert_eq!(host_ports, expected);
    }

    #[test]
    fn test_compose_volumes_are_declared() {
        let compose = compose();
        let services = compose["services"].as_mapping().unwrap();
        let declared = compose["volumes"].as_mapping().unwrap();

        let mut used = HashSet::new();
        for (name, service) in services {
            assert_eq!(service["restart"].as_str(), Some("always"), "service {:?}", name);

            for volume in service["volumes"].as_sequence().into_iter().flatten() {
                let source = volume.as_str().unwrap().split(':').next().unwrap();
                if source.starts_with('.') || source.starts_with('/') {
                    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(source);
                    assert!(path.exists(), "bind mount {} is missing", source);
                } else {
                    assert!(declared.contains_key(source), "named volume {} is not declared", source);
                    used.insert(source.to_string());
                }
            }
        }

        for (volume, _) in declared {
            let volume = volume.as_str().unwrap();
            assert!(used.contains(volume), "volume {} is declared but never mounted", volume);
        }
    }

    #[test]
    fn test_schema_declares_tables() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS events"));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS account_query"));
    }

    #[tokio::test]
    async fn test_eventstore_client_from_default_url() {
        assert!(connect_eventstore(DEFAULT_EVENTSTORE_URL).is_ok());
    }
}
