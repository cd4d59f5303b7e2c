//! Decision Threshold
//!
//! The optimal cutoff is produced by the training pipeline and loaded once.
//! It is never adjusted at runtime.

use serde::{Deserialize, Serialize};

/// Margin around the threshold inside which a prediction is only MEDIUM confidence
pub const CONFIDENCE_MARGIN: f64 = 0.1;

/// Credit decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Approve,
    Reject,
}

/// How far the probability sits from the cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("threshold must be a finite value in [0, 1], got {0}")]
pub struct InvalidThreshold(pub f64);

/// On-disk shape of the threshold artifact
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ThresholdFile {
    Bare(f64),
    Wrapped { threshold: f64 },
}

impl ThresholdFile {
    pub fn value(&self) -> f64 {
        match self {
            ThresholdFile::Bare(v) => *v,
            ThresholdFile::Wrapped { threshold } => *threshold,
        }
    }
}

/// Probability cutoff: at or above it the applicant is rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, InvalidThreshold> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidThreshold(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn decide(&self, probability: f64) -> Decision {
        if probability >= self.0 {
            Decision::Reject
        } else {
            Decision::Approve
        }
    }

    pub fn confidence(&self, probability: f64) -> Confidence {
        if (probability - self.0).abs() > CONFIDENCE_MARGIN {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}
