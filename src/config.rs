//! Configuration module

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use validator::Validate;

use crate::explain::{ExplainerMode, ExplanationPolicy, DEFAULT_TOP_K};
use crate::features::SchemaPolicy;
use crate::model::ArtifactPaths;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected pretty or json)", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    #[validate(range(min = 1))]
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// Model, threshold and feature list locations
    pub artifacts: ArtifactPaths,

    /// Handling of records that do not match the schema
    pub schema_policy: SchemaPolicy,

    /// Which explainer serves /predict
    pub explainer: ExplainerMode,

    /// Optional importance table for the static explainer
    pub importance_table: Option<PathBuf>,

    /// What to do when an explanation fails
    pub explanation_policy: ExplanationPolicy,

    /// Number of attributions returned per prediction
    #[validate(range(min = 1, max = 1000))]
    pub top_k: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));

        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 5001)?,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_format: parse_var(&lookup, "LOG_FORMAT", LogFormat::default())?,
            artifacts: ArtifactPaths {
                model: path("MODEL_PATH", "models/lightgbm_final_model.json"),
                threshold: path("THRESHOLD_PATH", "models/optimal_threshold.json"),
                features: path("FEATURES_PATH", "data/processed/final_features_list.json"),
            },
            schema_policy: parse_var(&lookup, "SCHEMA_POLICY", SchemaPolicy::default())?,
            explainer: parse_var(&lookup, "EXPLAINER", ExplainerMode::default())?,
            importance_table: lookup("IMPORTANCE_TABLE_PATH").map(PathBuf::from),
            explanation_policy: parse_var(&lookup, "EXPLANATION_FAILURE", ExplanationPolicy::default())?,
            top_k: parse_var(&lookup, "TOP_K", DEFAULT_TOP_K)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.schema_policy, SchemaPolicy::Strict);
        assert_eq!(config.explainer, ExplainerMode::TreeShap);
        assert_eq!(config.explanation_policy, ExplanationPolicy::Degrade);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.importance_table.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("SCHEMA_POLICY", "lenient"),
            ("EXPLAINER", "static"),
            ("EXPLANATION_FAILURE", "fail"),
            ("TOP_K", "5"),
            ("ENVIRONMENT", "production"),
            ("MODEL_PATH", "/srv/model.json"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.schema_policy, SchemaPolicy::Lenient);
        assert_eq!(config.explainer, ExplainerMode::Static);
        assert_eq!(config.explanation_policy, ExplanationPolicy::Fail);
        assert_eq!(config.top_k, 5);
        assert!(config.is_production());
        assert_eq!(config.artifacts.model, PathBuf::from("/srv/model.json"));
    }

    #[test]
    fn test_reject_unknown_enum_value() {
        let err = config_from(&[("EXPLAINER", "lime")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "EXPLAINER", .. }));
    }

    #[test]
    fn test_reject_out_of_range() {
        assert!(matches!(config_from(&[("TOP_K", "0")]), Err(ConfigError::Validation(_))));
        assert!(matches!(config_from(&[("PORT", "0")]), Err(ConfigError::Validation(_))));
        assert!(matches!(config_from(&[("PORT", "http")]), Err(ConfigError::Invalid { .. })));
    }
}
