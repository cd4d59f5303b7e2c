//! Model Module - artifacts, tree ensemble and inference

pub mod booster;
pub mod inference;
pub mod loader;
pub mod threshold;
pub mod tree;

pub use booster::GbdtModel;
pub use inference::{Classifier, InferenceEngine, InferenceError, Prediction};
pub use loader::{ArtifactPaths, ArtifactStore, InitError, ModelMetadata};
pub use threshold::{Confidence, Decision, Threshold};
pub use tree::{MissingType, Node, Split, SplitRule, Tree};

/// Error raised while reading a model dump
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("malformed model dump: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model is not a binary classifier (num_class={num_class}, trees_per_iteration={trees_per_iteration})")]
    NotBinary {
        num_class: usize,
        trees_per_iteration: usize,
    },

    #[error("unsupported objective '{0}'")]
    UnsupportedObjective(String),

    #[error("model has no trees")]
    NoTrees,

    #[error("model dump nests deeper than the JSON parser limit of 128 levels (trees deeper than about 120 splits)")]
    TooDeep,

    #[error("invalid tree: {0}")]
    InvalidTree(String),

    #[error("split on feature {feature} but the model has {num_features} features")]
    FeatureOutOfRange { feature: usize, num_features: usize },
}
