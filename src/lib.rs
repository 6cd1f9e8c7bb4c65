// ============================================================================
// bank_account_es - Event-sourced bank accounts with CQRS
// ============================================================================
//
// Commands are validated by the BankAccount aggregate, resulting events are
// appended to EventStoreDB, PostgreSQL or memory, and query processors fold
// them into read models served over HTTP.
//
// ============================================================================

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod demo;
pub mod domain;
pub mod event_sourcing;
pub mod health;
pub mod metrics;
pub mod utils;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Structured logging with environment-based filtering.
/// Defaults to INFO, overridable with RUST_LOG (e.g. `RUST_LOG=debug`).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bank_account_es=debug")),
        )
        .init();
}
