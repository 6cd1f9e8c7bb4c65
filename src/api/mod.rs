// ============================================================================
// HTTP API
// ============================================================================
//
//   POST /accounts/{id}/open
//   POST /accounts/{id}/deposit    {"amount": "12.50"}
//   POST /accounts/{id}/withdraw   {"amount": "12.50"}
//   POST /accounts/{id}/checks     {"check_number": "1170", "amount": "12.50"}
//   GET  /accounts/{id}
//   GET  /accounts/{id}/events
//   GET  /health
//   GET  /metrics
//
// ============================================================================

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{AmountRequest, CommandAccepted, WriteCheckRequest};

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use crate::app::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/accounts/{id}")
            .route("", web::get().to(handlers::get_account))
            .route("/events", web::get().to(handlers::get_account_events))
            .route("/open", web::post().to(handlers::open_account))
            .route("/deposit", web::post().to(handlers::deposit))
            .route("/withdraw", web::post().to(handlers::withdraw))
            .route("/checks", web::post().to(handlers::write_check)),
    )
    .route("/health", web::get().to(handlers::health))
    .route("/metrics", web::get().to(handlers::metrics));
}

/// Run the HTTP server until shutdown
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    tracing::info!("🌐 Starting HTTP server on http://{}:{}", host, port);

    let state = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
