//! Request Normalizer
//!
//! Turns an inbound JSON payload into feature vectors aligned to the schema.
//! How a record that does not match the schema is treated depends on the
//! configured `SchemaPolicy`.

use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use super::schema::FeatureSchema;
use super::vector::{coerce_value, FeatureVector, DEFAULT_FEATURE_VALUE};

/// What to do with records that do not match the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Reject records whose field count or names differ from the schema
    #[default]
    Strict,
    /// Look up by name (missing -> 0.0), pad or truncate positional rows
    Lenient,
}

impl FromStr for SchemaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SchemaPolicy::Strict),
            "lenient" => Ok(SchemaPolicy::Lenient),
            other => Err(format!("unknown schema policy '{}' (expected strict or lenient)", other)),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error(
        "Incorrect number of features. Expected: {expected}, received: {received}{}",
        unknown_suffix(.unknown)
    )]
    SchemaMismatch {
        expected: usize,
        received: usize,
        unknown: Vec<String>,
    },
}

fn unknown_suffix(unknown: &[String]) -> String {
    if unknown.is_empty() {
        return String::new();
    }

    const SHOWN: usize = 5;
    let mut listed = unknown.iter().take(SHOWN).cloned().collect::<Vec<_>>().join(", ");
    if unknown.len() > SHOWN {
        listed.push_str(&format!(" (+{} more)", unknown.len() - SHOWN));
    }
    format!(" (unknown features: {})", listed)
}

/// Shape of the request body
#[derive(Debug, PartialEq)]
pub enum ClientPayload<'a> {
    Record(&'a Map<String, Value>),
    Positional(&'a [Value]),
    Batch(Vec<ClientPayload<'a>>),
}

impl<'a> ClientPayload<'a> {
    /// Classify a JSON body
    pub fn parse(body: &'a Value) -> Result<Self, NormalizeError> {
        match body {
            Value::Object(map) => Ok(ClientPayload::Record(map)),
            Value::Array(items) if items.is_empty() => Err(NormalizeError::MalformedRequest(
                "Empty array: no client data provided".to_string(),
            )),
            Value::Array(items) => {
                let rows: Option<Vec<ClientPayload<'a>>> = items
                    .iter()
                    .map(|item| match item {
                        Value::Object(map) => Some(ClientPayload::Record(map)),
                        Value::Array(row) => Some(ClientPayload::Positional(row)),
                        _ => None,
                    })
                    .collect();

                if let Some(rows) = rows {
                    Ok(ClientPayload::Batch(rows))
                } else if items.iter().any(|v| v.is_object() || v.is_array()) {
                    Err(NormalizeError::MalformedRequest(
                        "Invalid data format: array mixes records and values".to_string(),
                    ))
                } else {
                    Ok(ClientPayload::Positional(items))
                }
            }
            Value::Null => Err(NormalizeError::MalformedRequest(
                "No JSON data provided".to_string(),
            )),
            _ => Err(NormalizeError::MalformedRequest(
                "Invalid data format: expected an object or an array".to_string(),
            )),
        }
    }
}

/// Normalized request: one vector per record
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub vectors: Vec<FeatureVector>,
    pub batch: bool,
}

/// Aligns client records to the feature schema
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    policy: SchemaPolicy,
}

impl Normalizer {
    pub fn new(policy: SchemaPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SchemaPolicy {
        self.policy
    }

    /// Normalize a full request body
    pub fn normalize(
        &self,
        body: &Value,
        schema: &FeatureSchema,
    ) -> Result<NormalizedRequest, NormalizeError> {
        match ClientPayload::parse(body)? {
            ClientPayload::Batch(rows) => {
                let vectors = rows
                    .iter()
                    .map(|row| self.normalize_one(row, schema))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NormalizedRequest { vectors, batch: true })
            }
            single => Ok(NormalizedRequest {
                vectors: vec![self.normalize_one(&single, schema)?],
                batch: false,
            }),
        }
    }

    fn normalize_one(
        &self,
        payload: &ClientPayload<'_>,
        schema: &FeatureSchema,
    ) -> Result<FeatureVector, NormalizeError> {
        match payload {
            ClientPayload::Record(map) => self.normalize_record(map, schema),
            ClientPayload::Positional(values) => self.normalize_positional(values, schema),
            ClientPayload::Batch(_) => Err(NormalizeError::MalformedRequest(
                "Nested batches are not supported".to_string(),
            )),
        }
    }

    fn normalize_record(
        &self,
        record: &Map<String, Value>,
        schema: &FeatureSchema,
    ) -> Result<FeatureVector, NormalizeError> {
        if self.policy == SchemaPolicy::Strict {
            if record.len() != schema.len() {
                return Err(NormalizeError::SchemaMismatch {
                    expected: schema.len(),
                    received: record.len(),
                    unknown: Vec::new(),
                });
            }

            let unknown: Vec<String> = record
                .keys()
                .filter(|name| schema.index_of(name).is_none())
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(NormalizeError::SchemaMismatch {
                    expected: schema.len(),
                    received: record.len(),
                    unknown,
                });
            }
        }

        let values = schema
            .names()
            .iter()
            .map(|name| record.get(name).map(coerce_value).unwrap_or(DEFAULT_FEATURE_VALUE))
            .collect();

        Ok(FeatureVector::from_values(values))
    }

    fn normalize_positional(
        &self,
        row: &[Value],
        schema: &FeatureSchema,
    ) -> Result<FeatureVector, NormalizeError> {
        if self.policy == SchemaPolicy::Strict && row.len() != schema.len() {
            return Err(NormalizeError::SchemaMismatch {
                expected: schema.len(),
                received: row.len(),
                unknown: Vec::new(),
            });
        }

        let mut values: Vec<f64> = row.iter().take(schema.len()).map(coerce_value).collect();
        values.resize(schema.len(), DEFAULT_FEATURE_VALUE);

        Ok(FeatureVector::from_values(values))
    }
}
