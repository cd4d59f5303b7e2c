//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::explain::ExplainerMode;
use crate::features::SchemaPolicy;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    model_type: &'static str,
    threshold: f64,
    features_count: usize,
    explainer: ExplainerMode,
    schema_policy: SchemaPolicy,
    model_checksum: String,
    loaded_at: chrono::DateTime<chrono::Utc>,
    version: &'static str,
    environment: String,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let predictor = &state.predictor;

    Json(HealthResponse {
        status: "healthy",
        service: "Credit Scoring API",
        model_type: "LightGBM",
        threshold: predictor.threshold().value(),
        features_count: predictor.schema().len(),
        explainer: predictor.explainer_mode(),
        schema_policy: predictor.normalizer().policy(),
        model_checksum: state.metadata.checksum.clone(),
        loaded_at: state.metadata.loaded_at,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
