//! Feature Schema - canonical feature order
//!
//! The schema is the single source of truth for the column order the
//! classifier was trained on. It is loaded once at startup and never changes.

use std::collections::HashMap;

use serde::Deserialize;

/// Ordered, duplicate-free list of feature names
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

/// Error raised when a feature list cannot form a schema
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchemaError {
    #[error("feature list is empty")]
    Empty,

    #[error("duplicate feature name '{0}'")]
    Duplicate(String),
}

/// On-disk shape of the feature list artifact
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeatureListFile {
    Selected { selected_features: Vec<String> },
    Plain(Vec<String>),
}

impl FeatureListFile {
    pub fn into_names(self) -> Vec<String> {
        match self {
            FeatureListFile::Selected { selected_features } => selected_features,
            FeatureListFile::Plain(names) => names,
        }
    }
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names, index })
    }

    /// Number of features the classifier expects
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature in the vector
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}
