//! Response Assembler

use crate::explain::Attribution;
use crate::model::{Confidence, Decision, Prediction, Threshold};

/// What became of the explanation step
#[derive(Debug, Clone, PartialEq)]
pub enum ExplanationOutcome {
    /// Ranked attributions
    Ranked(Vec<Attribution>),
    /// No explainer configured
    Disabled,
    /// Explainer failed and the policy allowed the prediction through
    Unavailable(String),
}

impl ExplanationOutcome {
    pub fn attributions(&self) -> Option<&[Attribution]> {
        match self {
            ExplanationOutcome::Ranked(list) => Some(list),
            _ => None,
        }
    }
}

/// Everything known about one scored record
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub probability: f64,
    pub decision: Decision,
    pub threshold: f64,
    pub confidence: Confidence,
    pub explanation: ExplanationOutcome,
}

pub fn assemble(
    prediction: Prediction,
    threshold: Threshold,
    explanation: ExplanationOutcome,
) -> PredictionResult {
    PredictionResult {
        probability: prediction.probability,
        decision: prediction.decision,
        threshold: threshold.value(),
        confidence: prediction.confidence,
        explanation,
    }
}
