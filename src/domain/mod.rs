// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Value objects
// - Events
// - Commands
// - Errors
// - Aggregate implementation
// - Read model (view)
//
// This layer only depends on the traits in event_sourcing::core and
// event_sourcing::query, never on a storage backend.
//
// ============================================================================

pub mod account;
