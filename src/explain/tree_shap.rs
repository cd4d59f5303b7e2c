//! TreeSHAP - exact Shapley values for tree ensembles
//!
//! Path-dependent algorithm (Lundberg et al., "Consistent Individualized
//! Feature Attribution for Tree Ensembles", Algorithm 2). Runs in
//! O(leaves * depth^2) per tree and uses node cover as the background
//! distribution.
//!
//! Additivity: `sum(phi) + expected_value() == raw_score(x)`.

use std::sync::Arc;

use crate::features::{FeatureSchema, FeatureVector};
use crate::model::{GbdtModel, Node, Tree};

use super::{ExplainerMode, Explainer, ExplanationError, FeatureScore};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

const EMPTY: PathElement = PathElement {
    feature: None,
    zero_fraction: 0.0,
    one_fraction: 0.0,
    pweight: 0.0,
};

/// Per-request TreeSHAP over the loaded model
#[derive(Debug, Clone)]
pub struct TreeShapExplainer {
    model: Arc<GbdtModel>,
    schema: Arc<FeatureSchema>,
}

impl TreeShapExplainer {
    pub fn new(model: Arc<GbdtModel>, schema: Arc<FeatureSchema>) -> Self {
        Self { model, schema }
    }

    /// Baseline raw score the contributions are measured against
    pub fn expected_value(&self) -> f64 {
        self.model.expected_raw_score()
    }

    /// SHAP value of every feature for one row, in raw-score units
    pub fn shap_values(&self, x: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.model.num_features()];
        for tree in self.model.trees() {
            tree_shap(tree, x, &mut phi);
        }

        let scale = self.model.output_scale();
        if scale != 1.0 {
            phi.iter_mut().for_each(|p| *p *= scale);
        }
        phi
    }
}

impl Explainer for TreeShapExplainer {
    fn mode(&self) -> ExplainerMode {
        ExplainerMode::TreeShap
    }

    fn attribute(&self, vector: &FeatureVector) -> Result<Vec<FeatureScore>, ExplanationError> {
        if vector.len() != self.model.num_features() {
            return Err(ExplanationError::ShapeMismatch {
                expected: self.model.num_features(),
                received: vector.len(),
            });
        }

        let phi = self.shap_values(vector.as_slice());

        Ok(self
            .schema
            .names()
            .iter()
            .zip(phi)
            .map(|(name, score)| FeatureScore { feature: name.clone(), score })
            .collect())
    }
}

/// Add the contributions of one tree to `phi`
fn tree_shap(tree: &Tree, x: &[f64], phi: &mut [f64]) {
    recurse(tree, x, phi, 0, &[], 0, 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f64],
    phi: &mut [f64],
    node: usize,
    parent_path: &[PathElement],
    unique_depth: usize,
    parent_zero_fraction: f64,
    parent_one_fraction: f64,
    parent_feature: Option<usize>,
) {
    let mut path = Vec::with_capacity(unique_depth + 1);
    path.extend_from_slice(&parent_path[..unique_depth]);
    path.push(EMPTY);
    extend_path(
        &mut path,
        unique_depth,
        parent_zero_fraction,
        parent_one_fraction,
        parent_feature,
    );

    let nodes = tree.nodes();
    match &nodes[node] {
        Node::Leaf { value, .. } => {
            for i in 1..=unique_depth {
                let w = unwound_path_sum(&path, unique_depth, i);
                let el = path[i];
                if let Some(feature) = el.feature {
                    phi[feature] += w * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        Node::Split(split) => {
            let (hot, cold) = if split.next(x) == split.left {
                (split.left, split.right)
            } else {
                (split.right, split.left)
            };

            let hot_zero_fraction = nodes[hot].cover() / split.cover;
            let cold_zero_fraction = nodes[cold].cover() / split.cover;
            let mut incoming_zero_fraction = 1.0;
            let mut incoming_one_fraction = 1.0;
            let mut depth = unique_depth;

            // A feature already on the path is undone so it can be redone here
            if let Some(k) = (0..=unique_depth).find(|&k| path[k].feature == Some(split.feature)) {
                incoming_zero_fraction = path[k].zero_fraction;
                incoming_one_fraction = path[k].one_fraction;
                unwind_path(&mut path, unique_depth, k);
                depth -= 1;
            }

            recurse(
                tree,
                x,
                phi,
                hot,
                &path,
                depth + 1,
                hot_zero_fraction * incoming_zero_fraction,
                incoming_one_fraction,
                Some(split.feature),
            );
            recurse(
                tree,
                x,
                phi,
                cold,
                &path,
                depth + 1,
                cold_zero_fraction * incoming_zero_fraction,
                0.0,
                Some(split.feature),
            );
        }
    }
}

fn extend_path(
    path: &mut [PathElement],
    unique_depth: usize,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    path[unique_depth] = PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if unique_depth == 0 { 1.0 } else { 0.0 },
    };

    let d = unique_depth as f64;
    for i in (0..unique_depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - i as f64) / (d + 1.0);
    }
}

fn unwind_path(path: &mut [PathElement], unique_depth: usize, path_index: usize) {
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let d = unique_depth as f64;
    let mut next_one_portion = path[unique_depth].pweight;

    for i in (0..unique_depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - i as f64));
        }
    }

    for i in path_index..unique_depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
}

fn unwound_path_sum(path: &[PathElement], unique_depth: usize, path_index: usize) -> f64 {
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let d = unique_depth as f64;
    let mut next_one_portion = path[unique_depth].pweight;
    let mut total = 0.0;

    if one_fraction != 0.0 {
        for i in (0..unique_depth).rev() {
            let tmp = next_one_portion / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (d - i as f64);
        }
    } else {
        for i in (0..unique_depth).rev() {
            total += path[i].pweight / (zero_fraction * (d - i as f64));
        }
    }

    total * (d + 1.0)
}
