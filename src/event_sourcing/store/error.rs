use uuid::Uuid;

use crate::utils::IsTransient;

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("Cannot append empty event list")]
    EmptyAppend,

    #[error("Concurrency conflict on {aggregate_id}: expected version {expected}, but current is {actual}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("Event sequence gap on {aggregate_id}: expected {expected}, found {found}")]
    SequenceGap {
        aggregate_id: Uuid,
        expected: i64,
        found: i64,
    },

    #[error("Event belongs to aggregate {found}, expected {expected}")]
    AggregateMismatch { expected: Uuid, found: Uuid },

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("EventStoreDB error: {0}")]
    EventStoreDb(#[from] eventstore::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl EventStoreError {
    /// Another writer moved the aggregate past the expected version
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

impl IsTransient for EventStoreError {
    fn is_transient(&self) -> bool {
        match self {
            EventStoreError::ConcurrencyConflict { .. } | EventStoreError::Unavailable(_) => true,
            EventStoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            EventStoreError::EventStoreDb(e) => matches!(
                e,
                eventstore::Error::ServerError(_)
                    | eventstore::Error::GrpcConnectionError(_)
                    | eventstore::Error::DeadlineExceeded
            ),
            EventStoreError::EmptyAppend
            | EventStoreError::SequenceGap { .. }
            | EventStoreError::AggregateMismatch { .. }
            | EventStoreError::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_transient() {
        let err = EventStoreError::ConcurrencyConflict {
            aggregate_id: Uuid::new_v4(),
            expected: 1,
            actual: 2,
        };
        assert!(err.is_transient());
        assert!(err.is_conflict());
        assert!(err.to_string().contains("expected version 1, but current is 2"));
    }

    #[test]
    fn test_structural_errors_are_permanent() {
        assert!(!EventStoreError::EmptyAppend.is_transient());
        assert!(!EventStoreError::SequenceGap {
            aggregate_id: Uuid::new_v4(),
            expected: 2,
            found: 4,
        }
        .is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(EventStoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!EventStoreError::Database(sqlx::Error::PoolTimedOut).is_conflict());
        assert!(!EventStoreError::Database(sqlx::Error::RowNotFound).is_transient());
    }
}
