//! Error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::features::NormalizeError;
use crate::pipeline::PredictError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Client errors
    MalformedRequest(String),
    SchemaMismatch(String),

    // Model errors
    InferenceFailed(String),
    ExplanationFailed(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MalformedRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::SchemaMismatch(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::InferenceFailed(msg) => {
                tracing::error!("Inference error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed")
            }
            AppError::ExplanationFailed(msg) => {
                tracing::error!("Explanation error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Explanation failed")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Normalize(e @ NormalizeError::MalformedRequest(_)) => {
                AppError::MalformedRequest(e.to_string())
            }
            PredictError::Normalize(e @ NormalizeError::SchemaMismatch { .. }) => {
                AppError::SchemaMismatch(e.to_string())
            }
            PredictError::Inference(e) => AppError::InferenceFailed(e.to_string()),
            PredictError::Explanation(e) => AppError::ExplanationFailed(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("prediction task failed: {}", err))
    }
}
