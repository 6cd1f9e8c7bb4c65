use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::utils::CircuitState;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Command throughput, outcome and latency per aggregate type
// - Appended events by type
// - Optimistic concurrency conflicts and retries
// - Query processor failures
// - Circuit breaker state per guarded component
//
// All metrics are registered with a private registry exposed via GET /metrics
// ============================================================================

/// Central metrics registry for the application
pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub commands_total: IntCounterVec,
    pub command_duration: HistogramVec,

    // Event Store Metrics
    pub events_appended_total: IntCounterVec,
    pub concurrency_conflicts_total: IntCounterVec,

    // Query Metrics
    pub query_dispatch_failures_total: IntCounterVec,

    // Resilience Metrics
    pub retry_attempts_total: IntCounterVec,
    pub circuit_breaker_state: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Command Metrics
        let commands_total = IntCounterVec::new(
            Opts::new("commands_total", "Total commands handled"),
            &["aggregate", "outcome"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("command_duration_seconds", "Command handling duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["aggregate"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        // Event Store Metrics
        let events_appended_total = IntCounterVec::new(
            Opts::new("events_appended_total", "Total events appended to the event store"),
            &["aggregate", "event_type"],
        )?;
        registry.register(Box::new(events_appended_total.clone()))?;

        let concurrency_conflicts_total = IntCounterVec::new(
            Opts::new("concurrency_conflicts_total", "Appends rejected on a stale expected version"),
            &["aggregate"],
        )?;
        registry.register(Box::new(concurrency_conflicts_total.clone()))?;

        // Query Metrics
        let query_dispatch_failures_total = IntCounterVec::new(
            Opts::new("query_dispatch_failures_total", "Query processor dispatch failures"),
            &["query"],
        )?;
        registry.register(Box::new(query_dispatch_failures_total.clone()))?;

        // Resilience Metrics
        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new(
                "circuit_breaker_state",
                "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
            ),
            &["component"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            commands_total,
            command_duration,
            events_appended_total,
            concurrency_conflicts_total,
            query_dispatch_failures_total,
            retry_attempts_total,
            circuit_breaker_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_command(&self, aggregate: &str, outcome: &str, duration_secs: f64) {
        self.commands_total.with_label_values(&[aggregate, outcome]).inc();
        self.command_duration.with_label_values(&[aggregate]).observe(duration_secs);
    }

    pub fn record_event_appended(&self, aggregate: &str, event_type: &str) {
        self.events_appended_total.with_label_values(&[aggregate, event_type]).inc();
    }

    pub fn record_concurrency_conflict(&self, aggregate: &str) {
        self.concurrency_conflicts_total.with_label_values(&[aggregate]).inc();
    }

    pub fn record_query_failure(&self, query: &str) {
        self.query_dispatch_failures_total.with_label_values(&[query]).inc();
    }

    pub fn record_retry_attempt(&self, operation: &str) {
        self.retry_attempts_total.with_label_values(&[operation]).inc();
    }

    pub fn set_circuit_state(&self, component: &str, state: CircuitState) {
        self.circuit_breaker_state
            .with_label_values(&[component])
            .set(state.as_gauge());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_command() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command("account", "success", 0.01);
        metrics.record_command("account", "rejected", 0.02);
        metrics.record_command("account", "success", 0.03);

        let gathered = metrics.registry.gather();
        let commands = gathered.iter().find(|m| m.name() == "commands_total").unwrap();
        assert_eq!(commands.metric.len(), 2); // success + rejected

        let duration = gathered
            .iter()
            .find(|m| m.name() == "command_duration_seconds")
            .unwrap();
        assert_eq!(duration.metric[0].histogram.sample_count, Some(3));
    }

    #[test]
    fn test_record_conflicts_and_retries() {
        let metrics = Metrics::new().unwrap();
        metrics.record_concurrency_conflict("account");
        metrics.record_retry_attempt("account_command");
        metrics.record_retry_attempt("account_command");

        let gathered = metrics.registry.gather();
        let retries = gathered.iter().find(|m| m.name() == "retry_attempts_total").unwrap();
        assert_eq!(retries.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_circuit_breaker_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_circuit_state("eventstoredb", CircuitState::Closed);
        metrics.set_circuit_state("eventstoredb", CircuitState::Open);

        let gathered = metrics.registry.gather();
        let state = gathered.iter().find(|m| m.name() == "circuit_breaker_state").unwrap();
        assert_eq!(state.metric[0].gauge.value, Some(1.0));
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_event_appended("account", "AccountOpened");
        metrics.record_query_failure("account_query");

        let text = metrics.render().unwrap();
        assert!(text.contains("events_appended_total{aggregate=\"account\",event_type=\"AccountOpened\"} 1"));
        assert!(text.contains("query_dispatch_failures_total{query=\"account_query\"} 1"));
    }
}
