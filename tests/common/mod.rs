//! Shared fixtures: a small LightGBM dump over a 234-feature schema

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use credit_scoring_api::config::Config;
use credit_scoring_api::model::ArtifactStore;
use credit_scoring_api::{create_router, AppState};

pub const FEATURE_COUNT: usize = 234;
pub const THRESHOLD: f64 = 0.1;

const NAMED: &[&str] = &[
    "EXT_SOURCE_1",
    "EXT_SOURCE_2",
    "EXT_SOURCE_3",
    "DAYS_EMPLOYED",
    "PAYMENT_RATE",
    "AMT_ANNUITY",
    "CODE_GENDER",
    "INSTAL_DPD_MEAN",
];

pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = NAMED.iter().map(|s| s.to_string()).collect();
    names.extend((NAMED.len()..FEATURE_COUNT).map(|i| format!("feature_{}", i)));
    names
}

fn leaf(value: f64, count: u64) -> Value {
    json!({"leaf_value": value, "leaf_count": count})
}

fn split(feature: usize, threshold: f64, count: u64, left: Value, right: Value) -> Value {
    json!({
        "split_feature": feature,
        "threshold": threshold,
        "decision_type": "<=",
        "default_left": true,
        "missing_type": "None",
        "internal_count": count,
        "left_child": left,
        "right_child": right
    })
}

/// High external scores and long employment lower the risk
pub fn model_dump() -> Value {
    let trees = vec![
        split(1, 0.5, 1000, leaf(1.0, 600), leaf(-1.5, 400)),
        split(2, 0.4, 1000, leaf(0.8, 500), leaf(-1.2, 500)),
        split(
            3,
            -2000.0,
            1000,
            leaf(-0.4, 300),
            split(0, 0.6, 700, leaf(0.3, 400), leaf(-0.2, 300)),
        ),
    ];

    json!({
        "name": "tree",
        "version": "v3",
        "num_class": 1,
        "num_tree_per_iteration": 1,
        "label_index": 0,
        "max_feature_idx": FEATURE_COUNT - 1,
        "objective": "binary sigmoid:1",
        "average_output": false,
        "feature_names": feature_names(),
        "tree_info": trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| json!({"tree_index": i, "num_leaves": 3, "shrinkage": 1, "tree_structure": t}))
            .collect::<Vec<_>>()
    })
}

pub fn write_artifacts(dir: &Path) -> Vec<(String, String)> {
    let model = dir.join("model.json");
    let threshold = dir.join("threshold.json");
    let features = dir.join("features.json");

    std::fs::write(&model, model_dump().to_string()).unwrap();
    std::fs::write(&threshold, THRESHOLD.to_string()).unwrap();
    std::fs::write(&features, json!({"selected_features": feature_names()}).to_string()).unwrap();

    vec![
        ("MODEL_PATH".to_string(), model.display().to_string()),
        ("THRESHOLD_PATH".to_string(), threshold.display().to_string()),
        ("FEATURES_PATH".to_string(), features.display().to_string()),
    ]
}

/// Build state from fixture artifacts plus extra environment overrides
pub fn state_with(overrides: &[(&str, &str)]) -> AppState {
    let dir = tempfile::tempdir().unwrap();
    let mut vars: HashMap<String, String> = write_artifacts(dir.path()).into_iter().collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
    let store = ArtifactStore::load(&config.artifacts).unwrap();
    AppState::new(config, &store).unwrap()
}

pub fn app_with(overrides: &[(&str, &str)]) -> Router {
    create_router(state_with(overrides))
}

pub fn app() -> Router {
    app_with(&[])
}

/// All features at 0 except the low-risk profile
pub fn low_risk_client() -> Value {
    let mut record: Map<String, Value> = feature_names().into_iter().map(|n| (n, json!(0.0))).collect();
    for (k, v) in [
        ("EXT_SOURCE_2", json!(0.78)),
        ("EXT_SOURCE_3", json!(0.688)),
        ("EXT_SOURCE_1", json!(0.897)),
        ("INSTAL_DPD_MEAN", json!(0.0)),
        ("CODE_GENDER", json!(0)),
        ("DAYS_EMPLOYED", json!(-3000)),
        ("PAYMENT_RATE", json!(0.05)),
        ("AMT_ANNUITY", json!(12000)),
    ] {
        record.insert(k.to_string(), v);
    }
    Value::Object(record)
}

/// All features at 0
pub fn zero_client() -> Value {
    Value::Object(feature_names().into_iter().map(|n| (n, json!(0.0))).collect())
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_raw(app: Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}
