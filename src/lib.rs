//! Credit Scoring API
//!
//! Serves default-risk predictions from a pre-trained LightGBM model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CREDIT SCORING API                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌─────────┐ │
//! │  │ Normalizer│─►│ Inference  │─►│ Explainer │─►│ Response│ │
//! │  │ (schema)  │  │ (LightGBM) │  │ (SHAP /   │  │ (JSON)  │ │
//! │  │           │  │            │  │  static)  │  │         │ │
//! │  └───────────┘  └─────┬──────┘  └─────┬─────┘  └─────────┘ │
//! │                       └───────┬───────┘                     │
//! │                               ▼                             │
//! │                     ┌──────────────────┐                    │
//! │                     │  Artifact Store  │                    │
//! │                     │ model/threshold/ │                    │
//! │                     │  feature schema  │                    │
//! │                     └──────────────────┘                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod explain;
pub mod features;
pub mod handlers;
pub mod model;
pub mod pipeline;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use model::{ArtifactStore, InitError, ModelMetadata};
use pipeline::Predictor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub metadata: Arc<ModelMetadata>,
    pub config: config::Config,
}

impl AppState {
    /// Wire the prediction pipeline from loaded artifacts
    pub fn new(config: config::Config, store: &ArtifactStore) -> Result<Self, InitError> {
        let predictor = Predictor::from_store(store, &config)?;
        Ok(Self {
            predictor: Arc::new(predictor),
            metadata: Arc::new(store.metadata().clone()),
            config,
        })
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
