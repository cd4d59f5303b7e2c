//! Features Module - schema, sanitized vectors and request normalization

pub mod normalizer;
pub mod schema;
pub mod vector;

pub use normalizer::{ClientPayload, NormalizeError, NormalizedRequest, Normalizer, SchemaPolicy};
pub use schema::{FeatureListFile, FeatureSchema, SchemaError};
pub use vector::{coerce_value, FeatureVector, DEFAULT_FEATURE_VALUE};
