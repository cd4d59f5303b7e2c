//! Gradient Boosted Trees - binary LightGBM classifier
//!
//! Raw score is the sum of the leaf values of every tree (divided by the tree
//! count for random-forest style models). Probability is the sigmoid of the
//! raw score scaled by the objective's sigmoid coefficient.

use serde::Deserialize;

use super::tree::{DumpTree, Tree};
use super::ModelError;

#[derive(Debug, Deserialize)]
struct ModelDump {
    #[serde(default = "one")]
    num_class: usize,
    #[serde(default = "one")]
    num_tree_per_iteration: usize,
    max_feature_idx: usize,
    #[serde(default)]
    objective: String,
    #[serde(default)]
    average_output: bool,
    #[serde(default)]
    feature_names: Vec<String>,
    tree_info: Vec<DumpTree>,
}

fn one() -> usize {
    1
}

/// Loaded LightGBM binary classifier
#[derive(Debug, Clone)]
pub struct GbdtModel {
    trees: Vec<Tree>,
    num_features: usize,
    sigmoid: f64,
    average_output: bool,
    feature_names: Vec<String>,
}

impl GbdtModel {
    pub fn new(
        trees: Vec<Tree>,
        num_features: usize,
        sigmoid: f64,
        average_output: bool,
    ) -> Result<Self, ModelError> {
        if trees.is_empty() {
            return Err(ModelError::NoTrees);
        }
        if !(sigmoid.is_finite() && sigmoid > 0.0) {
            return Err(ModelError::UnsupportedObjective(format!("sigmoid:{}", sigmoid)));
        }
        for tree in &trees {
            if let Some(feature) = tree.max_feature() {
                if feature >= num_features {
                    return Err(ModelError::FeatureOutOfRange { feature, num_features });
                }
            }
        }

        Ok(Self {
            trees,
            num_features,
            sigmoid,
            average_output,
            feature_names: Vec::new(),
        })
    }

    /// Parse the JSON produced by LightGBM's `dump_model()`
    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        Self::from_slice(raw.as_bytes())
    }

    /// Parse a model dump straight from file bytes (must be valid UTF-8)
    pub fn from_slice(raw: &[u8]) -> Result<Self, ModelError> {
        let dump: ModelDump = serde_json::from_slice(raw).map_err(|e| {
            if e.to_string().starts_with("recursion limit exceeded") {
                ModelError::TooDeep
            } else {
                ModelError::Parse(e)
            }
        })?;

        if dump.num_class != 1 || dump.num_tree_per_iteration != 1 {
            return Err(ModelError::NotBinary {
                num_class: dump.num_class,
                trees_per_iteration: dump.num_tree_per_iteration,
            });
        }
        let sigmoid = parse_binary_objective(&dump.objective)?;

        let mut tree_info = dump.tree_info;
        tree_info.sort_by_key(|t| t.tree_index);
        let trees = tree_info
            .into_iter()
            .map(|t| Tree::from_dump(t.tree_structure))
            .collect::<Result<Vec<_>, _>>()?;

        let mut model = Self::new(trees, dump.max_feature_idx + 1, sigmoid, dump.average_output)?;
        model.feature_names = dump.feature_names;
        Ok(model)
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Feature names recorded in the dump (may be empty)
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Factor applied to the summed tree outputs
    pub fn output_scale(&self) -> f64 {
        if self.average_output {
            1.0 / self.trees.len() as f64
        } else {
            1.0
        }
    }

    /// Raw margin (log-odds) for one row
    pub fn raw_score(&self, x: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        sum * self.output_scale()
    }

    /// Raw margin averaged over the training distribution
    pub fn expected_raw_score(&self) -> f64 {
        let sum: f64 = self.trees.iter().map(Tree::expected_value).sum();
        sum * self.output_scale()
    }

    /// Probability of the positive class
    pub fn probability(&self, x: &[f64]) -> f64 {
        1.0 / (1.0 + (-self.sigmoid * self.raw_score(x)).exp())
    }
}

/// Objective strings look like `binary sigmoid:1`
fn parse_binary_objective(objective: &str) -> Result<f64, ModelError> {
    let mut parts = objective.split_whitespace();
    match parts.next() {
        Some("binary") => {}
        _ => return Err(ModelError::UnsupportedObjective(objective.to_string())),
    }

    let mut sigmoid = 1.0;
    for part in parts {
        if let Some(value) = part.strip_prefix("sigmoid:") {
            sigmoid = value
                .parse()
                .map_err(|_| ModelError::UnsupportedObjective(objective.to_string()))?;
        }
    }
    Ok(sigmoid)
}
