// tests/pipeline_e2e.rs
//
// Full pipeline runs over fixture payloads: stores + weather + sentiment merged
// into one feature vector.

use std::sync::Arc;

use campaign_features::sentiment::SentimentLabel;
use campaign_features::{
    FeaturePipeline, FeatureVectorAssembler, MarketData, PipelineError, SentimentAnalyzer,
};
use serde_json::json;

fn fixture() -> MarketData {
    let raw = include_str!("fixtures/market_10001.json");
    serde_json::from_str(raw).expect("fixture parses")
}

fn pipeline() -> FeaturePipeline {
    let analyzer = SentimentAnalyzer::builtin().expect("builtin lexicon");
    FeaturePipeline::new(FeatureVectorAssembler::default(), Arc::new(analyzer))
}

#[test]
fn single_cafe_with_mild_week() {
    let report = pipeline().run(&fixture()).expect("pipeline runs");
    let v = &report.vector;

    assert_eq!(v.zipcode.as_deref(), Some("10001"));
    assert_eq!(v.store_counts.len(), 1);
    assert_eq!(v.store_counts["cafe"], 1);
    assert_eq!(v.avg_ratings["cafe"], 4.5);
    assert_eq!(v.spatial_density, 1);
    assert_eq!(v.centroid.latitude(), 40.0);
    assert_eq!(v.centroid.longitude(), -73.0);
    assert!(!v.weather.adverse_weather);
    assert!((v.campaign_suitability_score - 4.5).abs() < 1e-9);

    // Current conditions
    assert_eq!(v.hour_of_day, Some(9));
    assert_eq!(v.day_of_week, Some(0));
    assert_eq!(v.weather.current_temp, Some(4.0));

    // Two positive reviews
    let cafe = v.store_sentiment["cafe"];
    assert_eq!(cafe.sentiment, SentimentLabel::Positive);
    assert!(cafe.sentiment_score > 0.5);

    // Weekly summary
    assert_eq!(v.weather.weekly_forecast.len(), 2);
    assert_eq!(v.weather.avg_max_temp, Some(21.0));
    assert_eq!(v.weather.total_precip, Some(0.0));
}

#[test]
fn wet_day_zeroes_the_score() {
    let mut data = fixture();
    let daily = data.weather.daily.as_mut().expect("daily block");
    daily.precipitation_sum = Some(vec![Some(0.0), Some(12.5)]);

    let v = pipeline().run(&data).unwrap().vector;
    assert!(v.weather.adverse_weather);
    assert_eq!(v.campaign_suitability_score, 0.0);
    assert_eq!(v.spatial_density, 1);
}

#[test]
fn empty_payload_degrades_to_defaults() {
    let v = pipeline().run(&MarketData::default()).unwrap().vector;
    assert!(v.store_counts.is_empty());
    assert!(v.avg_ratings.is_empty());
    assert!(v.store_sentiment.is_empty());
    assert_eq!(v.spatial_density, 0);
    assert_eq!(v.campaign_suitability_score, 0.0);
    assert_eq!(v.hour_of_day, None);
    assert_eq!(v.day_of_week, None);
    // Daily fallback record
    assert_eq!(v.weather.avg_temp, Some(20.0));
    assert!(!v.weather.adverse_weather);
}

#[test]
fn misaligned_hourly_is_a_data_integrity_error() {
    let data: MarketData = serde_json::from_value(json!({
        "stores": [],
        "weather": {"hourly": {
            "time": ["t0", "t1", "t2"],
            "temperature_2m": [1.0, 2.0],
            "relative_humidity_2m": [50, 50, 50],
            "wind_speed_10m": [5, 5, 5]
        }}
    }))
    .unwrap();
    let err = pipeline().run(&data).unwrap_err();
    assert!(matches!(err, PipelineError::MisalignedHourly { .. }));
    assert!(err.is_data_integrity());
}

#[test]
fn misaligned_hourly_next_to_daily_is_still_rejected() {
    let mut data = fixture();
    data.weather = serde_json::from_value(json!({
        "daily": {
            "time": ["d1"],
            "temperature_2m_max": [20],
            "temperature_2m_min": [10],
            "precipitation_sum": [0]
        },
        "hourly": {
            "time": ["t0", "t1", "t2"],
            "temperature_2m": [1.0],
            "relative_humidity_2m": [50, 50, 50],
            "wind_speed_10m": [5, 5, 5]
        }
    }))
    .unwrap();
    let err = pipeline().run(&data).unwrap_err();
    assert!(matches!(err, PipelineError::MisalignedHourly { .. }));
}

#[test]
fn aligned_hourly_next_to_daily_keeps_daily_features() {
    let mut data = fixture();
    data.weather.hourly = serde_json::from_value(json!({
        "time": ["t0", "t1"],
        "temperature_2m": [1.0, 2.0],
        "relative_humidity_2m": [50, 50],
        "wind_speed_10m": [40, 40]
    }))
    .unwrap();
    let report = pipeline().run(&data).unwrap();
    // Daily rules decide: strong hourly wind does not count.
    assert!(!report.weather.adverse_weather);
    assert_eq!(report.weather.weekly_forecast.len(), 2);
    assert_eq!(report.weather_table.hourly.len(), 2);
}

#[test]
fn vector_serializes_with_expected_keys() {
    let v = pipeline().run(&fixture()).unwrap().vector;
    let json = serde_json::to_value(&v).unwrap();
    for key in [
        "zipcode",
        "store_counts",
        "avg_ratings",
        "spatial_density",
        "centroid",
        "weather",
        "campaign_suitability_score",
        "hour_of_day",
        "day_of_week",
        "store_sentiment",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["centroid"], json!([40.0, -73.0]));
    assert_eq!(json["store_sentiment"]["cafe"]["sentiment"], "positive");
}
