//! Credit Scoring API server
//!
//! Loads the artifacts, then serves `/health` and `/predict`. Any artifact
//! problem aborts startup before the listener is bound.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credit_scoring_api::config::{Config, LogFormat};
use credit_scoring_api::model::ArtifactStore;
use credit_scoring_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(config.log_format);

    tracing::info!("Credit Scoring API starting...");
    tracing::info!("Environment: {}", config.environment);
    if config.is_production() && config.log_format == LogFormat::Pretty {
        tracing::warn!("Pretty log output in production; set LOG_FORMAT=json for structured logs");
    }

    let store = ArtifactStore::load(&config.artifacts).context("Failed to load model artifacts")?;

    // Build application state
    let state = AppState::new(config.clone(), &store).context("Failed to build prediction pipeline")?;

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "credit_scoring_api=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
