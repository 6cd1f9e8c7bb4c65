use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::account::{AccountError, MoneyParseError};
use crate::event_sourcing::{CommandError, EventStoreError};

// ============================================================================
// HTTP Error Mapping
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    InvalidAmount(#[from] MoneyParseError),

    #[error("account {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("{0}")]
    Internal(String),
}

impl From<CommandError<AccountError>> for ApiError {
    fn from(e: CommandError<AccountError>) -> Self {
        match e {
            CommandError::Domain(e) => ApiError::Account(e),
            CommandError::Store(e) => ApiError::Store(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

/// Error response body for JSON responses
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn summary(&self) -> &'static str {
        match self {
            ApiError::Account(e) if e.is_validation() => "Validation error",
            ApiError::Account(_) => "Command rejected",
            ApiError::InvalidAmount(_) => "Validation error",
            ApiError::NotFound(_) => "Not found",
            ApiError::Store(EventStoreError::ConcurrencyConflict { .. }) => "Conflict",
            ApiError::Store(EventStoreError::Unavailable(_)) => "Service unavailable",
            ApiError::Store(_) | ApiError::Internal(_) => "Internal server error",
        }
    }

    /// Internal failures are logged, not echoed to the client
    fn details(&self) -> Option<String> {
        match self {
            ApiError::Store(EventStoreError::ConcurrencyConflict { .. })
            | ApiError::Store(EventStoreError::Unavailable(_)) => Some(self.to_string()),
            ApiError::Store(_) | ApiError::Internal(_) => None,
            _ => Some(self.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Account(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Account(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(EventStoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
            ApiError::Store(EventStoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.summary(),
            details: self.details(),
        })
    }
}
