//! Feature Vector - sanitized model input
//!
//! Every value in a `FeatureVector` is finite. Anything a client sends that
//! cannot be read as a finite number becomes `0.0`.

use serde_json::Value;

/// Value substituted for missing or invalid inputs
pub const DEFAULT_FEATURE_VALUE: f64 = 0.0;

/// Fixed-width numeric vector in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Build a vector, replacing non-finite values with the default
    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values.into_iter().map(sanitize).collect())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        DEFAULT_FEATURE_VALUE
    }
}

/// Coerce a raw JSON value to a finite number
///
/// Strings are trimmed and parsed, so "nan", "inf" and "-inf" parse to
/// non-finite values and are then replaced like any other invalid input.
pub fn coerce_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    parsed.map(sanitize).unwrap_or(DEFAULT_FEATURE_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_values_pass_through() {
        assert_eq!(coerce_value(&json!(0.78)), 0.78);
        assert_eq!(coerce_value(&json!(-3000)), -3000.0);
        assert_eq!(coerce_value(&json!("12000")), 12000.0);
        assert_eq!(coerce_value(&json!(" 1e3 ")), 1000.0);
    }

    #[test]
    fn test_invalid_values_become_zero() {
        for raw in [
            json!(null),
            json!("nan"),
            json!("NaN"),
            json!("inf"),
            json!("-inf"),
            json!("Infinity"),
            json!("null"),
            json!("abc"),
            json!(""),
            json!([1, 2]),
            json!({"nested": 1}),
        ] {
            assert_eq!(coerce_value(&raw), 0.0, "value {} should coerce to 0.0", raw);
        }
    }

    #[test]
    fn test_booleans() {
        assert_eq!(coerce_value(&json!(true)), 1.0);
        assert_eq!(coerce_value(&json!(false)), 0.0);
    }

    #[test]
    fn test_vector_never_holds_non_finite() {
        let v = FeatureVector::from_values(vec![1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY]);
        assert_eq!(v.as_slice(), &[1.0, 0.0, 0.0, 0.0]);
    }
}
