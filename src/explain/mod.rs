//! Explanation Module - per-prediction feature attributions
//!
//! Two interchangeable explainers sit behind the `Explainer` trait:
//! - [`TreeShapExplainer`]: exact TreeSHAP on the loaded trees, per request
//! - [`StaticImportanceExplainer`]: precomputed global importances, no per-request work
//!
//! Both feed the same ranking step, so the response shape does not depend on
//! the mode.

pub mod static_importance;
pub mod tree_shap;

use std::str::FromStr;

use serde::Serialize;

use crate::features::{FeatureSchema, FeatureVector};

pub use static_importance::StaticImportanceExplainer;
pub use tree_shap::TreeShapExplainer;

/// Default number of attributions returned
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExplanationError {
    #[error("input has {received} features, explainer expects {expected}")]
    ShapeMismatch { expected: usize, received: usize },

    #[error("non-finite attribution for feature '{0}'")]
    NonFinite(String),

    #[error("{0}")]
    Failed(String),
}

/// Which explainer serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainerMode {
    #[default]
    TreeShap,
    Static,
    None,
}

impl FromStr for ExplainerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree_shap" | "shap" => Ok(ExplainerMode::TreeShap),
            "static" => Ok(ExplainerMode::Static),
            "none" | "off" => Ok(ExplainerMode::None),
            other => Err(format!(
                "unknown explainer '{}' (expected tree_shap, static or none)",
                other
            )),
        }
    }
}

/// What happens to a prediction when its explanation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationPolicy {
    /// Return probability and decision without attributions
    #[default]
    Degrade,
    /// Fail the whole request
    Fail,
}

impl FromStr for ExplanationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(ExplanationPolicy::Degrade),
            "fail" => Ok(ExplanationPolicy::Fail),
            other => Err(format!(
                "unknown explanation failure policy '{}' (expected degrade or fail)",
                other
            )),
        }
    }
}

/// Raw score for one feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
}

/// Direction of a feature's contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    IncreaseRisk,
    DecreaseRisk,
}

impl Impact {
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Impact::IncreaseRisk
        } else {
            Impact::DecreaseRisk
        }
    }
}

/// Ranked attribution with the observed feature value
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub feature: String,
    pub score: f64,
    pub feature_value: Option<f64>,
    pub impact: Impact,
}

/// Attribution capability
pub trait Explainer: Send + Sync {
    fn mode(&self) -> ExplainerMode;

    /// Unranked scores for one vector
    fn attribute(&self, vector: &FeatureVector) -> Result<Vec<FeatureScore>, ExplanationError>;
}

/// Attribute, then keep the `top_k` largest scores by magnitude
pub fn explain(
    explainer: &dyn Explainer,
    vector: &FeatureVector,
    schema: &FeatureSchema,
    top_k: usize,
) -> Result<Vec<Attribution>, ExplanationError> {
    let scores = explainer.attribute(vector)?;

    if let Some(bad) = scores.iter().find(|s| !s.score.is_finite()) {
        return Err(ExplanationError::NonFinite(bad.feature.clone()));
    }

    Ok(rank(scores, vector, schema, top_k))
}

/// Sort by descending |score| (stable, so ties keep their order) and truncate
pub fn rank(
    mut scores: Vec<FeatureScore>,
    vector: &FeatureVector,
    schema: &FeatureSchema,
    top_k: usize,
) -> Vec<Attribution> {
    scores.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
    scores.truncate(top_k);

    scores
        .into_iter()
        .map(|s| Attribution {
            feature_value: schema.index_of(&s.feature).and_then(|i| vector.get(i)),
            impact: Impact::from_score(s.score),
            feature: s.feature,
            score: s.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(feature: &str, score: f64) -> FeatureScore {
        FeatureScore { feature: feature.to_string(), score }
    }

    #[test]
    fn test_rank_by_magnitude() {
        let schema = FeatureSchema::new(vec!["a".into(), "b".into(), "c".into(), "d".into()]).unwrap();
        let vector = FeatureVector::from_values(vec![1.0, 2.0, 3.0, 4.0]);
        let ranked = rank(
            vec![score("a", 0.1), score("b", -0.9), score("c", 0.5), score("d", 0.0)],
            &vector,
            &schema,
            3,
        );

        let names: Vec<_> = ranked.iter().map(|a| a.feature.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(ranked[0].impact, Impact::DecreaseRisk);
        assert_eq!(ranked[0].feature_value, Some(2.0));
        assert_eq!(ranked[1].impact, Impact::IncreaseRisk);

        for pair in ranked.windows(2) {
            assert!(pair[0].score.abs() >= pair[1].score.abs());
        }
    }

    #[test]
    fn test_zero_score_decreases_risk() {
        assert_eq!(Impact::from_score(0.0), Impact::DecreaseRisk);
        assert_eq!(Impact::from_score(-0.0), Impact::DecreaseRisk);
        assert_eq!(Impact::from_score(1e-9), Impact::IncreaseRisk);
    }

    #[test]
    fn test_unknown_feature_has_no_value() {
        let schema = FeatureSchema::new(vec!["a".into()]).unwrap();
        let vector = FeatureVector::from_values(vec![1.0]);
        let ranked = rank(vec![score("elsewhere", 0.3)], &vector, &schema, 10);
        assert_eq!(ranked[0].feature_value, None);
    }

    struct NanExplainer;

    impl Explainer for NanExplainer {
        fn mode(&self) -> ExplainerMode {
            ExplainerMode::TreeShap
        }

        fn attribute(&self, _vector: &FeatureVector) -> Result<Vec<FeatureScore>, ExplanationError> {
            Ok(vec![score("a", f64::NAN)])
        }
    }

    #[test]
    fn test_non_finite_scores_fail() {
        let schema = FeatureSchema::new(vec!["a".into()]).unwrap();
        let vector = FeatureVector::from_values(vec![1.0]);
        let err = explain(&NanExplainer, &vector, &schema, 10).unwrap_err();
        assert_eq!(err, ExplanationError::NonFinite("a".to_string()));
    }

    #[test]
    fn test_mode_and_policy_from_str() {
        assert_eq!("tree_shap".parse::<ExplainerMode>(), Ok(ExplainerMode::TreeShap));
        assert_eq!("Static".parse::<ExplainerMode>(), Ok(ExplainerMode::Static));
        assert_eq!("none".parse::<ExplainerMode>(), Ok(ExplainerMode::None));
        assert!("lime".parse::<ExplainerMode>().is_err());

        assert_eq!("fail".parse::<ExplanationPolicy>(), Ok(ExplanationPolicy::Fail));
        assert!("retry".parse::<ExplanationPolicy>().is_err());
    }
}
