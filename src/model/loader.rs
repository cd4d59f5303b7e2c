//! Artifact Store - model, threshold and feature schema
//!
//! Everything is loaded once at startup and shared read-only through `Arc`.
//! Any inconsistency between the artifacts is fatal: the server must not
//! accept traffic with a model it cannot feed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::features::{FeatureListFile, FeatureSchema, SchemaError};

use super::booster::GbdtModel;
use super::threshold::{InvalidThreshold, Threshold, ThresholdFile};
use super::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("invalid feature list: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Threshold(#[from] InvalidThreshold),

    #[error("feature list has {schema} names but the model expects {model} features")]
    WidthMismatch { schema: usize, model: usize },
}

/// Where the artifacts live on disk
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub threshold: PathBuf,
    pub features: PathBuf,
}

/// Model metadata reported by the health endpoint
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub model_path: String,
    pub checksum: String,
    pub num_trees: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable holder of the production artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model: Arc<GbdtModel>,
    threshold: Threshold,
    schema: Arc<FeatureSchema>,
    metadata: ModelMetadata,
}

impl ArtifactStore {
    /// Assemble a store from artifacts already in memory
    pub fn new(
        model: GbdtModel,
        threshold: Threshold,
        schema: FeatureSchema,
        metadata: ModelMetadata,
    ) -> Result<Self, InitError> {
        if schema.len() != model.num_features() {
            return Err(InitError::WidthMismatch {
                schema: schema.len(),
                model: model.num_features(),
            });
        }

        if !model.feature_names().is_empty() && model.feature_names() != schema.names() {
            tracing::warn!(
                "Model dump feature names differ from the feature list; using the feature list order"
            );
        }

        Ok(Self {
            model: Arc::new(model),
            threshold,
            schema: Arc::new(schema),
            metadata,
        })
    }

    /// Load and cross-check all artifacts
    pub fn load(paths: &ArtifactPaths) -> Result<Self, InitError> {
        tracing::info!("Loading artifacts...");
        let start = std::time::Instant::now();

        let model_bytes = read_file(&paths.model)?;
        let checksum = hex::encode(Sha256::digest(&model_bytes));
        let model = GbdtModel::from_slice(&model_bytes).map_err(|source| InitError::Model {
            path: paths.model.clone(),
            source,
        })?;

        let threshold_file: ThresholdFile = parse_json(&paths.threshold)?;
        let threshold = Threshold::new(threshold_file.value())?;

        let features: FeatureListFile = parse_json(&paths.features)?;
        let schema = FeatureSchema::new(features.into_names())?;

        let metadata = ModelMetadata {
            model_path: paths.model.display().to_string(),
            checksum,
            num_trees: model.trees().len(),
            loaded_at: Utc::now(),
        };

        let store = Self::new(model, threshold, schema, metadata)?;

        tracing::info!(
            trees = store.metadata.num_trees,
            threshold = store.threshold.value(),
            features = store.schema.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Artifacts loaded"
        );

        Ok(store)
    }

    pub fn model(&self) -> &Arc<GbdtModel> {
        &self.model
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, InitError> {
    std::fs::read(path).map_err(|source| InitError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, InitError> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|source| InitError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
