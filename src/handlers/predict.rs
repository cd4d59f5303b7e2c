//! Prediction handler
//!
//! The core decision enum is translated to the French wire labels here and
//! nowhere else.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::explain::{Attribution, ExplainerMode, Impact};
use crate::model::{Confidence, Decision};
use crate::pipeline::{ExplanationOutcome, PredictionResult};
use crate::{AppResult, AppState};

/// Wire label for a decision
pub fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Approve => "ACCORDE",
        Decision::Reject => "REFUSE",
    }
}

/// Attribution score, keyed by the explainer that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AttributionScore {
    #[serde(rename = "shap_value")]
    ShapValue(f64),
    #[serde(rename = "importance")]
    Importance(f64),
}

#[derive(Debug, Serialize)]
pub struct FeatureAttribution {
    pub feature: String,
    #[serde(flatten)]
    pub score: AttributionScore,
    pub feature_value: Option<f64>,
    pub impact: Impact,
}

impl FeatureAttribution {
    fn new(attribution: Attribution, mode: ExplainerMode) -> Self {
        let score = match mode {
            ExplainerMode::Static => AttributionScore::Importance(attribution.score),
            ExplainerMode::TreeShap | ExplainerMode::None => AttributionScore::ShapValue(attribution.score),
        };
        Self {
            feature: attribution.feature,
            score,
            feature_value: attribution.feature_value,
            impact: attribution.impact,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionBody {
    pub probability: f64,
    pub decision: &'static str,
    pub threshold: f64,
    pub confidence: Confidence,
    pub top_features: Option<Vec<FeatureAttribution>>,
    pub explanation: ExplainerMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation_status: Option<&'static str>,
}

impl PredictionBody {
    fn from_result(result: PredictionResult, mode: ExplainerMode) -> Self {
        let (top_features, explanation_status) = match result.explanation {
            ExplanationOutcome::Ranked(list) => (
                Some(list.into_iter().map(|a| FeatureAttribution::new(a, mode)).collect()),
                None,
            ),
            ExplanationOutcome::Disabled => (None, None),
            ExplanationOutcome::Unavailable(_) => (None, Some("unavailable")),
        };

        Self {
            probability: result.probability,
            decision: decision_label(result.decision),
            threshold: result.threshold,
            confidence: result.confidence,
            top_features,
            explanation: mode,
            explanation_status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Single {
        #[serde(flatten)]
        prediction: PredictionBody,
        processing_time_ms: f64,
    },
    Batch {
        count: usize,
        predictions: Vec<PredictionBody>,
        processing_time_ms: f64,
    },
}

/// Score one record or a batch of records
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);

    let Json(body) = payload.map_err(|rejection| {
        let _guard = span.enter();
        tracing::debug!("Rejected body: {}", rejection.body_text());
        rejection
    })?;

    let predictor = state.predictor.clone();
    let task_span = span.clone();
    let scored = tokio::task::spawn_blocking(move || {
        let _guard = task_span.enter();
        predictor.predict_payload(&body)
    })
    .await??;

    let _guard = span.enter();
    let mode = state.predictor.explainer_mode();
    let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let response = if scored.batch {
        let predictions: Vec<PredictionBody> = scored
            .results
            .into_iter()
            .map(|r| PredictionBody::from_result(r, mode))
            .collect();
        tracing::info!(
            count = predictions.len(),
            elapsed_ms = processing_time_ms,
            "Batch scored"
        );
        PredictResponse::Batch {
            count: predictions.len(),
            predictions,
            processing_time_ms,
        }
    } else {
        let prediction = scored
            .results
            .into_iter()
            .next()
            .map(|r| PredictionBody::from_result(r, mode))
            .ok_or_else(|| crate::AppError::InternalError("no prediction produced".to_string()))?;
        tracing::info!(
            decision = prediction.decision,
            probability = prediction.probability,
            elapsed_ms = processing_time_ms,
            "Prediction served"
        );
        PredictResponse::Single {
            prediction,
            processing_time_ms,
        }
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_labels() {
        assert_eq!(decision_label(Decision::Approve), "ACCORDE");
        assert_eq!(decision_label(Decision::Reject), "REFUSE");
    }

    #[test]
    fn test_single_body_shape() {
        let result = PredictionResult {
            probability: 0.04,
            decision: Decision::Approve,
            threshold: 0.1,
            confidence: Confidence::Medium,
            explanation: ExplanationOutcome::Ranked(vec![Attribution {
                feature: "EXT_SOURCE_2".to_string(),
                score: -1.2,
                feature_value: Some(0.78),
                impact: Impact::DecreaseRisk,
            }]),
        };
        let response = PredictResponse::Single {
            prediction: PredictionBody::from_result(result, ExplainerMode::TreeShap),
            processing_time_ms: 1.5,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["decision"], "ACCORDE");
        assert_eq!(json["confidence"], "MEDIUM");
        assert_eq!(json["explanation"], "tree_shap");
        assert_eq!(json["top_features"][0]["impact"], "decrease_risk");
        assert_eq!(json["top_features"][0]["feature_value"], 0.78);
        assert_eq!(json["top_features"][0]["shap_value"], -1.2);
        assert!(json["top_features"][0].get("importance").is_none());
        assert!(json.get("explanation_status").is_none());
    }

    #[test]
    fn test_static_scores_use_importance_key() {
        let attribution = Attribution {
            feature: "EXT_SOURCE_2".to_string(),
            score: 0.122,
            feature_value: Some(0.5),
            impact: Impact::IncreaseRisk,
        };
        let json = serde_json::to_value(FeatureAttribution::new(attribution, ExplainerMode::Static)).unwrap();
        assert_eq!(json["importance"], 0.122);
        assert!(json.get("shap_value").is_none());
        assert!(json.get("score").is_none());
    }

    #[test]
    fn test_degraded_body_shape() {
        let result = PredictionResult {
            probability: 0.9,
            decision: Decision::Reject,
            threshold: 0.1,
            confidence: Confidence::High,
            explanation: ExplanationOutcome::Unavailable("boom".to_string()),
        };
        let json = serde_json::to_value(PredictionBody::from_result(result, ExplainerMode::TreeShap)).unwrap();
        assert_eq!(json["decision"], "REFUSE");
        assert!(json["top_features"].is_null());
        assert_eq!(json["explanation_status"], "unavailable");
    }
}
