//! Decision Trees - LightGBM JSON dump format
//!
//! Trees are read from the output of `Booster.dump_model()` and flattened
//! into an arena with the root at index 0. Each node keeps the number of
//! training samples that reached it (`cover`), which TreeSHAP needs.

use serde::Deserialize;

use super::ModelError;

/// LightGBM treats |x| <= 1e-35 as zero for `missing_type = Zero`
const ZERO_THRESHOLD: f64 = 1e-35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MissingType {
    #[default]
    None,
    Zero,
    NaN,
}

// ============================================================================
// DUMP FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DumpThreshold {
    Value(f64),
    Categories(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DumpNode {
    Split {
        split_feature: usize,
        threshold: DumpThreshold,
        #[serde(default = "default_decision_type")]
        decision_type: String,
        #[serde(default)]
        default_left: bool,
        #[serde(default)]
        missing_type: MissingType,
        #[serde(default)]
        internal_count: f64,
        left_child: Box<DumpNode>,
        right_child: Box<DumpNode>,
    },
    Leaf {
        leaf_value: f64,
        #[serde(default)]
        leaf_count: f64,
    },
}

fn default_decision_type() -> String {
    "<=".to_string()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DumpTree {
    #[serde(default)]
    pub tree_index: usize,
    pub tree_structure: DumpNode,
}

// ============================================================================
// ARENA
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// Go left when `value <= threshold`
    Numerical(f64),
    /// Go left when the truncated value is one of the categories
    Categorical(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub feature: usize,
    pub rule: SplitRule,
    pub default_left: bool,
    pub missing: MissingType,
    pub left: usize,
    pub right: usize,
    pub cover: f64,
}

impl Split {
    /// LightGBM decision rule for one feature value
    pub fn goes_left(&self, value: f64) -> bool {
        match &self.rule {
            SplitRule::Numerical(threshold) => {
                let mut value = value;
                if value.is_nan() && self.missing != MissingType::NaN {
                    value = 0.0;
                }
                let is_missing = match self.missing {
                    MissingType::Zero => (-ZERO_THRESHOLD..=ZERO_THRESHOLD).contains(&value),
                    MissingType::NaN => value.is_nan(),
                    MissingType::None => false,
                };
                if is_missing {
                    return self.default_left;
                }
                value <= *threshold
            }
            SplitRule::Categorical(categories) => {
                if value.is_nan() {
                    return false;
                }
                let category = value as i64;
                category >= 0 && categories.contains(&category)
            }
        }
    }

    /// Child reached by `x`
    pub fn next(&self, x: &[f64]) -> usize {
        let value = x.get(self.feature).copied().unwrap_or(f64::NAN);
        if self.goes_left(value) {
            self.left
        } else {
            self.right
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Split(Split),
    Leaf { value: f64, cover: f64 },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split(split) => split.cover,
            Node::Leaf { cover, .. } => *cover,
        }
    }
}

/// One regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree from nodes already laid out with the root at index 0
    ///
    /// Children must sit after their parent (pre-order layout), which rules
    /// out cycles.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ModelError> {
        if nodes.is_empty() {
            return Err(ModelError::InvalidTree("tree has no nodes".to_string()));
        }
        for (index, node) in nodes.iter().enumerate() {
            if let Node::Split(split) = node {
                if split.left >= nodes.len() || split.right >= nodes.len() {
                    return Err(ModelError::InvalidTree(format!(
                        "child index out of range ({} nodes)",
                        nodes.len()
                    )));
                }
                if split.left <= index || split.right <= index {
                    return Err(ModelError::InvalidTree(format!(
                        "node {} links back to an earlier node",
                        index
                    )));
                }
            }
        }
        Ok(Self { nodes })
    }

    pub(crate) fn from_dump(root: DumpNode) -> Result<Self, ModelError> {
        let mut nodes = Vec::new();
        push_node(&mut nodes, root)?;
        Self::new(nodes)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Leaf value reached by `x`
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value, .. } => return *value,
                Node::Split(split) => index = split.next(x),
            }
        }
    }

    /// Cover-weighted mean of the leaf values
    pub fn expected_value(&self) -> f64 {
        self.expected_from(0)
    }

    fn expected_from(&self, index: usize) -> f64 {
        match &self.nodes[index] {
            Node::Leaf { value, .. } => *value,
            Node::Split(split) => {
                let left_cover = self.nodes[split.left].cover();
                let right_cover = self.nodes[split.right].cover();
                let total = left_cover + right_cover;
                let left = self.expected_from(split.left);
                let right = self.expected_from(split.right);
                if total > 0.0 {
                    (left * left_cover + right * right_cover) / total
                } else {
                    (left + right) / 2.0
                }
            }
        }
    }

    /// Highest feature index used by any split
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Split(split) => Some(split.feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }
}

fn push_node(nodes: &mut Vec<Node>, dump: DumpNode) -> Result<usize, ModelError> {
    let index = nodes.len();
    match dump {
        DumpNode::Leaf { leaf_value, leaf_count } => {
            nodes.push(Node::Leaf { value: leaf_value, cover: leaf_count });
        }
        DumpNode::Split {
            split_feature,
            threshold,
            decision_type,
            default_left,
            missing_type,
            internal_count,
            left_child,
            right_child,
        } => {
            let rule = parse_rule(&decision_type, threshold)?;

            // Placeholder until both children have their indices
            nodes.push(Node::Leaf { value: 0.0, cover: 0.0 });
            let left = push_node(nodes, *left_child)?;
            let right = push_node(nodes, *right_child)?;

            let cover = if internal_count > 0.0 {
                internal_count
            } else {
                nodes[left].cover() + nodes[right].cover()
            };

            nodes[index] = Node::Split(Split {
                feature: split_feature,
                rule,
                default_left,
                missing: missing_type,
                left,
                right,
                cover,
            });
        }
    }
    Ok(index)
}

fn parse_rule(decision_type: &str, threshold: DumpThreshold) -> Result<SplitRule, ModelError> {
    match (decision_type, threshold) {
        ("<=", DumpThreshold::Value(t)) => Ok(SplitRule::Numerical(t)),
        ("==", DumpThreshold::Value(t)) => Ok(SplitRule::Categorical(vec![t as i64])),
        ("==", DumpThreshold::Categories(raw)) => raw
            .split("||")
            .map(|c| c.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map(SplitRule::Categorical)
            .map_err(|_| ModelError::InvalidTree(format!("bad categorical threshold '{}'", raw))),
        (other, _) => Err(ModelError::InvalidTree(format!(
            "unsupported decision type '{}'",
            other
        ))),
    }
}
