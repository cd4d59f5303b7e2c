//! HTTP handlers

pub mod health;
pub mod predict;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Routes served by this API
pub const ENDPOINTS: &[&str] = &["/", "/health", "/predict"];

/// Service description
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Credit Scoring API",
        "endpoints": {
            "health": "GET /health - service status",
            "predict": "POST /predict - default probability and decision",
            "home": "GET / - this page"
        },
        "model": "LightGBM",
        "explainer": state.predictor.explainer_mode(),
        "features": state.predictor.schema().len(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Fallback for unknown routes
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "status": StatusCode::NOT_FOUND.as_u16(),
            "available_endpoints": ENDPOINTS
        })),
    )
}
