use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::error::ApiError;
use crate::app::AppState;
use crate::domain::account::{AccountCommand, Money};

// ============================================================================
// Request Handlers
// ============================================================================

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Amounts travel as decimal strings ("12.50") to keep JSON floats out of money
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteCheckRequest {
    pub check_number: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandAccepted {
    pub version: i64,
}

/// Caller-supplied request id is kept in the envelope metadata
fn request_metadata(req: &HttpRequest) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    if let Some(request_id) = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        metadata.insert("request_id".to_string(), request_id.to_string());
    }
    metadata
}

async fn execute(
    state: &AppState,
    req: &HttpRequest,
    account_id: Uuid,
    command: AccountCommand,
) -> Result<HttpResponse, ApiError> {
    let name = command.name();
    let version = state
        .cqrs
        .execute_with_metadata(account_id, command, request_metadata(req))
        .await?;

    tracing::info!(account_id = %account_id, command = name, version = version, "Command accepted");
    Ok(HttpResponse::Ok().json(CommandAccepted { version }))
}

pub async fn open_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let account_id = path.into_inner();
    execute(&state, &req, account_id, AccountCommand::OpenAccount { account_id }).await
}

pub async fn deposit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<AmountRequest>,
) -> Result<HttpResponse, ApiError> {
    let amount: Money = body.amount.parse()?;
    execute(&state, &req, path.into_inner(), AccountCommand::DepositMoney { amount }).await
}

pub async fn withdraw(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<AmountRequest>,
) -> Result<HttpResponse, ApiError> {
    let amount: Money = body.amount.parse()?;
    execute(&state, &req, path.into_inner(), AccountCommand::WithdrawMoney { amount }).await
}

pub async fn write_check(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<WriteCheckRequest>,
) -> Result<HttpResponse, ApiError> {
    let WriteCheckRequest { check_number, amount } = body.into_inner();
    let amount: Money = amount.parse()?;
    execute(
        &state,
        &req,
        path.into_inner(),
        AccountCommand::WriteCheck { check_number, amount },
    )
    .await
}

pub async fn get_account(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let account_id = path.into_inner();
    match state.account_query.load(account_id).await? {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Err(ApiError::NotFound(account_id)),
    }
}

pub async fn get_account_events(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let account_id = path.into_inner();
    let events = state.cqrs.store().load_events(account_id).await?;
    if events.is_empty() {
        return Err(ApiError::NotFound(account_id));
    }
    Ok(HttpResponse::Ok().json(events))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let health = state.system_health().await;
    if health.overall.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(health)
    } else {
        HttpResponse::Ok().json(health)
    }
}

pub async fn metrics(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    state.refresh_gauges().await;
    let body = state.metrics.render()?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}
