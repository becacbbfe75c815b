//! Predictive Intelligence Engine
//!
//! Failure-prediction serving backend: scores operational metrics with a
//! versioned fixed-weight model and records every prediction in an
//! append-only log.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PREDICTIVE ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────────┐   ┌─────────────────┐ │
//! │  │  API      │──►│  Prediction     │──►│  Model          │ │
//! │  │  (Axum)   │   │  Service        │   │  (pure scoring) │ │
//! │  └───────────┘   └───────┬─────────┘   └─────────────────┘ │
//! │                          │        └──► Prometheus metrics   │
//! │                          ▼                                  │
//! │                   ┌─────────────┐                           │
//! │                   │ PostgreSQL  │                           │
//! │                   └─────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod metrics;
mod model;
mod models;
mod service;
mod store;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    timeout::TimeoutLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};

pub use error::{AppError, AppResult};

use config::{Config, LogFormat, StorageBackend};
use metrics::PrometheusMetrics;
use model::{Model, ModelRegistry};
use service::PredictionService;
use store::{MemoryPredictionStore, PgPredictionStore, PredictionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    init_tracing(config.log_format);

    tracing::info!("Predictive Engine starting ({})...", config.environment);

    // Resolve the active model
    let registry = ModelRegistry::builtin().context("Invalid built-in model configuration")?;
    let model_config = registry
        .get(&config.model_version)
        .with_context(|| format!("available model versions: {:?}", registry.versions()))?
        .clone();
    let model = Model::from_config(model_config);
    tracing::info!(
        "Model loaded: {} (weights {:?}, bias {})",
        model.version(),
        model.config().weights,
        model.config().bias
    );

    // Initialize storage
    let store: Arc<dyn PredictionStore> = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Database: {}", config.database_host());
            let pool = db::create_pool(&config.database_url, config.database_max_connections)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await.context("Failed to run migrations")?;

            Arc::new(PgPredictionStore::new(pool))
        }
        StorageBackend::Memory => {
            if config.is_production() {
                anyhow::bail!("In-memory storage is not allowed in production");
            }
            tracing::warn!("Using in-memory storage; predictions are lost on restart");
            Arc::new(MemoryPredictionStore::new())
        }
    };

    let metrics = PrometheusMetrics::new().context("Failed to register metrics")?;

    // Build application state
    let service = PredictionService::new(model, store, Arc::new(metrics))
        .with_max_list_limit(config.max_list_limit);
    let state = AppState {
        service: Arc::new(service),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "predictive_engine=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub config: Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/metrics", get(handlers::metrics::export))
        .route("/predict", post(handlers::predictions::predict))
        .route("/predictions", get(handlers::predictions::list))
        .route("/predictions/:id", get(handlers::predictions::get))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
