// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic, reusable event sourcing infrastructure.
// Domain-specific code is in src/domain/
//
// ============================================================================

pub mod core;
pub mod cqrs;
pub mod query;
pub mod store;

pub use self::core::*;
pub use cqrs::{CommandError, CqrsFramework};
pub use query::{GenericQuery, LoggingQueryProcessor, QueryProcessor, View, ViewRepository};
pub use store::{EventStore, EventStoreError};

#[cfg(test)]
pub mod testing;
