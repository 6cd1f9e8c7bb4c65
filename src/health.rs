use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Health Check Abstractions
// ============================================================================
//
// Every backend (event store, view repository) reports its own health; the
// HTTP layer aggregates them into one system status.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// Health information for a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    #[serde(flatten)]
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub overall: HealthStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

impl SystemHealth {
    /// Unhealthy beats degraded beats healthy
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let mut has_degraded = false;
        let mut unhealthy = Vec::new();

        for health in &components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => unhealthy.push(format!("{}: {}", health.name, msg)),
                HealthStatus::Degraded(_) => has_degraded = true,
                HealthStatus::Healthy => {}
            }
        }

        let overall = if !unhealthy.is_empty() {
            HealthStatus::Unhealthy(unhealthy.join(", "))
        } else if has_degraded {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        };

        Self {
            overall,
            components: components
                .into_iter()
                .map(|health| (health.name.clone(), health))
                .collect(),
            check_time: Utc::now(),
        }
    }
}

/// Anything that can report its health
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    fn component_name(&self) -> &str;

    async fn check_health(&self) -> ComponentHealth;
}
