//! Prediction Pipeline
//!
//! ```text
//! payload ──► Normalizer ──► InferenceEngine ──► Explainer (optional) ──► assemble
//! ```
//!
//! The `Predictor` owns read-only handles to the artifacts and is shared by
//! every request. Nothing in here mutates state, so it is safe to call from
//! many threads at once.

pub mod response;

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::explain::{
    self, ExplainerMode, Explainer, ExplanationError, ExplanationPolicy,
    StaticImportanceExplainer, TreeShapExplainer,
};
use crate::features::{FeatureSchema, FeatureVector, NormalizeError, Normalizer};
use crate::model::{ArtifactStore, InferenceEngine, InferenceError, InitError, Threshold};

pub use response::{assemble, ExplanationOutcome, PredictionResult};

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("explanation failed: {0}")]
    Explanation(#[from] ExplanationError),
}

/// Results for one request body
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRequest {
    pub results: Vec<PredictionResult>,
    /// Body was an array of records
    pub batch: bool,
}

pub struct Predictor {
    schema: Arc<FeatureSchema>,
    normalizer: Normalizer,
    engine: InferenceEngine,
    explainer: Option<Arc<dyn Explainer>>,
    policy: ExplanationPolicy,
    top_k: usize,
}

impl Predictor {
    pub fn new(
        schema: Arc<FeatureSchema>,
        normalizer: Normalizer,
        engine: InferenceEngine,
        explainer: Option<Arc<dyn Explainer>>,
        policy: ExplanationPolicy,
        top_k: usize,
    ) -> Self {
        Self {
            schema,
            normalizer,
            engine,
            explainer,
            policy,
            top_k,
        }
    }

    /// Wire the pipeline from loaded artifacts and configuration
    pub fn from_store(store: &ArtifactStore, config: &Config) -> Result<Self, InitError> {
        let explainer: Option<Arc<dyn Explainer>> = match config.explainer {
            ExplainerMode::TreeShap => Some(Arc::new(TreeShapExplainer::new(
                store.model().clone(),
                store.schema().clone(),
            ))),
            ExplainerMode::Static => {
                let table = match &config.importance_table {
                    Some(path) => StaticImportanceExplainer::from_file(path)?,
                    None => StaticImportanceExplainer::default(),
                };
                let unknown = table
                    .table()
                    .iter()
                    .filter(|s| store.schema().index_of(&s.feature).is_none())
                    .count();
                if unknown > 0 {
                    tracing::warn!(unknown, "Importance table lists features missing from the schema");
                }
                Some(Arc::new(table))
            }
            ExplainerMode::None => None,
        };

        tracing::info!(
            explainer = ?config.explainer,
            schema_policy = ?config.schema_policy,
            explanation_policy = ?config.explanation_policy,
            top_k = config.top_k,
            "Prediction pipeline ready"
        );

        Ok(Self::new(
            store.schema().clone(),
            Normalizer::new(config.schema_policy),
            InferenceEngine::new(store.model().clone(), store.threshold()),
            explainer,
            config.explanation_policy,
            config.top_k,
        ))
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn threshold(&self) -> Threshold {
        self.engine.threshold()
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    pub fn explainer_mode(&self) -> ExplainerMode {
        self.explainer
            .as_ref()
            .map(|e| e.mode())
            .unwrap_or(ExplainerMode::None)
    }

    /// Score every record in a request body
    pub fn predict_payload(&self, body: &Value) -> Result<ScoredRequest, PredictError> {
        let normalized = self.normalizer.normalize(body, &self.schema)?;

        let results = normalized
            .vectors
            .iter()
            .map(|vector| self.predict_vector(vector))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScoredRequest {
            results,
            batch: normalized.batch,
        })
    }

    /// Score one sanitized vector
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<PredictionResult, PredictError> {
        let prediction = self.engine.predict(vector)?;

        let explanation = match &self.explainer {
            None => ExplanationOutcome::Disabled,
            Some(explainer) => {
                match explain::explain(explainer.as_ref(), vector, &self.schema, self.top_k) {
                    Ok(ranked) => ExplanationOutcome::Ranked(ranked),
                    Err(e) if self.policy == ExplanationPolicy::Degrade => {
                        tracing::warn!(error = %e, "Explanation failed, returning prediction without attributions");
                        ExplanationOutcome::Unavailable(e.to_string())
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        Ok(assemble(prediction, self.engine.threshold(), explanation))
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("features", &self.schema.len())
            .field("engine", &self.engine)
            .field("explainer", &self.explainer_mode())
            .field("policy", &self.policy)
            .field("top_k", &self.top_k)
            .finish()
    }
}
