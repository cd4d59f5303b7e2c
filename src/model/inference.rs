//! Inference Engine
//!
//! Runs the classifier on one sanitized vector and applies the threshold.
//! No state is touched while predicting, so identical vectors always give
//! bit-identical probabilities.

use std::sync::Arc;

use crate::features::FeatureVector;

use super::booster::GbdtModel;
use super::threshold::{Confidence, Decision, Threshold};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InferenceError {
    #[error("input has {received} features, model expects {expected}")]
    ShapeMismatch { expected: usize, received: usize },

    #[error("model produced a non-finite probability ({0})")]
    NonFinite(f64),
}

/// Probability-output capability of a trained model
pub trait Classifier: Send + Sync {
    /// Width of the input vector
    fn num_features(&self) -> usize;

    /// Probability of the positive (default) class
    fn predict_proba(&self, vector: &FeatureVector) -> Result<f64, InferenceError>;
}

impl Classifier for GbdtModel {
    fn num_features(&self) -> usize {
        GbdtModel::num_features(self)
    }

    fn predict_proba(&self, vector: &FeatureVector) -> Result<f64, InferenceError> {
        if vector.len() != GbdtModel::num_features(self) {
            return Err(InferenceError::ShapeMismatch {
                expected: GbdtModel::num_features(self),
                received: vector.len(),
            });
        }
        Ok(self.probability(vector.as_slice()))
    }
}

/// Classifier output after the decision rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub decision: Decision,
    pub confidence: Confidence,
}

#[derive(Clone)]
pub struct InferenceEngine {
    classifier: Arc<dyn Classifier>,
    threshold: Threshold,
}

impl InferenceEngine {
    pub fn new(classifier: Arc<dyn Classifier>, threshold: Threshold) -> Self {
        Self { classifier, threshold }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<Prediction, InferenceError> {
        let probability = self.classifier.predict_proba(vector)?;
        if !(probability.is_finite() && (0.0..=1.0).contains(&probability)) {
            return Err(InferenceError::NonFinite(probability));
        }

        Ok(Prediction {
            probability,
            decision: self.threshold.decide(probability),
            confidence: self.threshold.confidence(probability),
        })
    }
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("num_features", &self.classifier.num_features())
            .field("threshold", &self.threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::{MissingType, Node, Split, SplitRule, Tree};

    fn model() -> GbdtModel {
        let tree = Tree::new(vec![
            Node::Split(Split {
                feature: 0,
                rule: SplitRule::Numerical(0.5),
                default_left: true,
                missing: MissingType::None,
                left: 1,
                right: 2,
                cover: 20.0,
            }),
            Node::Leaf { value: -3.0, cover: 10.0 },
            Node::Leaf { value: 3.0, cover: 10.0 },
        ])
        .unwrap();
        GbdtModel::new(vec![tree], 2, 1.0, false).unwrap()
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn num_features(&self) -> usize {
            2
        }

        fn predict_proba(&self, _vector: &FeatureVector) -> Result<f64, InferenceError> {
            Ok(f64::NAN)
        }
    }

    #[test]
    fn test_threshold_consistency() {
        let engine = InferenceEngine::new(Arc::new(model()), Threshold::new(0.5).unwrap());

        for x in [0.0, 0.4, 0.6, 1.0] {
            let p = engine.predict(&FeatureVector::from_values(vec![x, 0.0])).unwrap();
            assert_eq!(p.decision == Decision::Reject, p.probability >= 0.5);
        }
    }

    #[test]
    fn test_deterministic() {
        let engine = InferenceEngine::new(Arc::new(model()), Threshold::new(0.5).unwrap());
        let v = FeatureVector::from_values(vec![0.7, 1.0]);

        let first = engine.predict(&v).unwrap();
        let second = engine.predict(&v).unwrap();
        assert_eq!(first.probability.to_bits(), second.probability.to_bits());
        assert_eq!(first.decision, second.decision);
    }

    #[test]
    fn test_shape_mismatch() {
        let engine = InferenceEngine::new(Arc::new(model()), Threshold::new(0.5).unwrap());
        let err = engine.predict(&FeatureVector::from_values(vec![1.0])).unwrap_err();
        assert_eq!(err, InferenceError::ShapeMismatch { expected: 2, received: 1 });
    }

    #[test]
    fn test_non_finite_output() {
        let engine = InferenceEngine::new(Arc::new(BrokenClassifier), Threshold::new(0.5).unwrap());
        let err = engine.predict(&FeatureVector::from_values(vec![0.0, 0.0])).unwrap_err();
        assert!(matches!(err, InferenceError::NonFinite(_)));
    }
}
