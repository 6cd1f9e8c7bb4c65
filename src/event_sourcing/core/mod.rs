// ============================================================================
// Event Sourcing Core - Generic Abstractions
// ============================================================================
//
// No domain-specific code lives here; everything is generic over the
// aggregate and its event type.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::{Aggregate, AggregateContext};
pub use event::{deserialize_event, serialize_event, DomainEvent, EventEnvelope};
