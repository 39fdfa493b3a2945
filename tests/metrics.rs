// tests/metrics.rs
use std::sync::Arc;

use campaign_features::metrics::Metrics;
use campaign_features::{FeaturePipeline, FeatureVectorAssembler, MarketData, SentimentAnalyzer};
use serde_json::json;
use shuttle_axum::axum::body::{self, Body};
use shuttle_axum::axum::http::{Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn metrics_endpoint_contains_pipeline_series() {
    // One recorder per process; this file is its own test binary.
    let metrics = Metrics::init().expect("install recorder");

    let pipeline = FeaturePipeline::new(
        FeatureVectorAssembler::default(),
        Arc::new(SentimentAnalyzer::builtin().unwrap()),
    );
    pipeline.run(&MarketData::default()).unwrap();
    let bad: MarketData = serde_json::from_value(json!({"weather": {"hourly": {
        "time": ["a"], "temperature_2m": [], "relative_humidity_2m": [1], "wind_speed_10m": [1]
    }}}))
    .unwrap();
    assert!(pipeline.run(&bad).is_err());

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "pipeline_runs_total 2",
        "pipeline_errors_total 1",
        "pipeline_build_ms",
    ] {
        assert!(text.contains(needle), "missing {needle:?} in:\n{text}");
    }
}
