use clap::Parser;
use std::sync::Arc;

use bank_account_es::app::AppState;
use bank_account_es::config::{Cli, Command};
use bank_account_es::metrics::Metrics;
use bank_account_es::{api, db, demo, init_tracing};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // .env first so clap's `env` fallbacks can see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing();

    if let Err(e) = cli.config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        anyhow::bail!(e);
    }

    match cli.command {
        Command::CheckConfig => {
            tracing::info!(backend = ?cli.config.backend, "✅ Configuration is valid");
            println!("configuration OK ({:?} backend)", cli.config.backend);
        }
        Command::InitDb => {
            let pool = db::connect_postgres(&cli.config).await?;
            db::ensure_schema(&pool).await?;
            println!("schema applied to {}", cli.config.redacted_database_url());
        }
        Command::Demo => {
            let metrics = Arc::new(Metrics::new()?);
            let state = AppState::from_config(&cli.config, metrics).await?;
            let view = demo::run_demo(&state).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Serve => {
            tracing::info!("🚀 Starting bank account service");
            let metrics = Arc::new(Metrics::new()?);
            tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

            let state = AppState::from_config(&cli.config, metrics).await?;
            let (host, port) = cli.config.http_bind_address();
            api::serve(state, &host, port).await?;
        }
    }

    Ok(())
}
