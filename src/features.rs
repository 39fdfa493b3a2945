//! # Feature vector
//! Composes store metrics, weather features and review sentiment into the flat
//! record handed to the campaign prompt.
//!
//! Store and weather builders share nothing and can run in any order. Sentiment is
//! the slowest step and is merged last by [`FeaturePipeline`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::pipeline::PipelineSettings;
use crate::error::PipelineError;
use crate::places::MarketData;
use crate::sentiment::{SentimentAnalyzer, SentimentResult};
use crate::stores::{AggregatedStoreMetrics, Centroid, StoreFeatureBuilder, StoreTable};
use crate::weather::{WeatherFeatureBuilder, WeatherFeatures, WeatherTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub zipcode: Option<String>,
    pub store_counts: std::collections::BTreeMap<String, usize>,
    pub avg_ratings: std::collections::BTreeMap<String, f64>,
    pub spatial_density: usize,
    pub centroid: Centroid,
    pub weather: WeatherFeatures,
    pub campaign_suitability_score: f64,
    pub hour_of_day: Option<u32>,
    /// Monday = 0.
    pub day_of_week: Option<u32>,
    #[serde(default)]
    pub store_sentiment: SentimentResult,
}

impl FeatureVector {
    /// Late merge of per-category review sentiment.
    pub fn with_sentiment(mut self, sentiment: SentimentResult) -> Self {
        self.store_sentiment = sentiment;
        self
    }
}

/// Every intermediate artifact of one run, for snapshots and prompt building.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureReport {
    pub store_table: StoreTable,
    pub metrics: AggregatedStoreMetrics,
    pub weather_table: WeatherTable,
    pub weather: WeatherFeatures,
    pub vector: FeatureVector,
}

/// `(0 if adverse else 1) × density × mean(avg_ratings)`.
pub fn suitability_score(adverse_weather: bool, metrics: &AggregatedStoreMetrics) -> f64 {
    if adverse_weather {
        return 0.0;
    }
    metrics.spatial_density as f64 * metrics.overall_rating()
}

/// `(hour_of_day, day_of_week)` from an ISO-8601 timestamp; both null when unparseable.
pub fn time_features(ts: Option<&str>) -> (Option<u32>, Option<u32>) {
    match ts.and_then(parse_timestamp) {
        Some(dt) => (Some(dt.hour()), Some(dt.weekday().num_days_from_monday())),
        None => (None, None),
    }
}

/// Accepts RFC 3339, naive date-times with or without seconds, and bare dates.
/// Offsets are kept as wall-clock time at that offset.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.naive_local());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorAssembler {
    stores: StoreFeatureBuilder,
    weather: WeatherFeatureBuilder,
}

impl FeatureVectorAssembler {
    pub fn new(stores: StoreFeatureBuilder, weather: WeatherFeatureBuilder) -> Self {
        Self { stores, weather }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.store_builder(), settings.weather_builder())
    }

    /// Feature vector without sentiment.
    pub fn assemble(&self, data: &MarketData) -> Result<FeatureVector, PipelineError> {
        Ok(self.report(data)?.vector)
    }

    pub fn report(&self, data: &MarketData) -> Result<FeatureReport, PipelineError> {
        let stores = self.stores.build(&data.stores);
        let weather = self.weather.build(&data.weather)?;
        let weather_table = self.weather.clean(&data.weather)?;

        let score = suitability_score(weather.adverse_weather, &stores.metrics);
        let current_time = data.weather.current.as_ref().and_then(|c| c.time.as_deref());
        let (hour_of_day, day_of_week) = time_features(current_time);
        if current_time.is_some() && hour_of_day.is_none() {
            warn!(ts = current_time, "unparseable current weather timestamp");
        }

        let metrics = stores.metrics;
        let vector = FeatureVector {
            zipcode: data.zipcode.clone(),
            store_counts: metrics.store_counts.clone(),
            avg_ratings: metrics.avg_ratings.clone(),
            spatial_density: metrics.spatial_density,
            centroid: metrics.centroid,
            weather: weather.clone(),
            campaign_suitability_score: score,
            hour_of_day,
            day_of_week,
            store_sentiment: SentimentResult::new(),
        };

        Ok(FeatureReport {
            store_table: stores.table,
            metrics,
            weather_table,
            weather,
            vector,
        })
    }
}

/// Assembler plus the injected sentiment analyzer: one call per request.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    assembler: FeatureVectorAssembler,
    analyzer: Arc<SentimentAnalyzer>,
}

impl FeaturePipeline {
    pub fn new(assembler: FeatureVectorAssembler, analyzer: Arc<SentimentAnalyzer>) -> Self {
        Self {
            assembler,
            analyzer,
        }
    }

    pub fn run(&self, data: &MarketData) -> Result<FeatureReport, PipelineError> {
        let started = Instant::now();
        counter!("pipeline_runs_total").increment(1);

        let mut report = match self.assembler.report(data) {
            Ok(r) => r,
            Err(e) => {
                counter!("pipeline_errors_total").increment(1);
                return Err(e);
            }
        };
        let sentiment = self.analyzer.score_places(&data.stores);
        report.vector = report.vector.with_sentiment(sentiment);

        let ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("pipeline_build_ms").record(ms);
        info!(
            zipcode = data.zipcode.as_deref().unwrap_or("-"),
            stores = data.stores.len(),
            score = report.vector.campaign_suitability_score,
            ms,
            "feature vector built"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn score_is_zero_when_adverse() {
        let m = AggregatedStoreMetrics {
            spatial_density: 4,
            avg_ratings: BTreeMap::from([("cafe".to_string(), 4.0)]),
            ..Default::default()
        };
        assert_eq!(suitability_score(true, &m), 0.0);
        assert_eq!(suitability_score(false, &m), 16.0);
    }

    #[test]
    fn score_is_zero_without_ratings() {
        let m = AggregatedStoreMetrics {
            spatial_density: 3,
            ..Default::default()
        };
        assert_eq!(suitability_score(false, &m), 0.0);
    }

    #[test]
    fn time_features_from_open_meteo_timestamp() {
        // 2024-01-03 is a Wednesday
        assert_eq!(time_features(Some("2024-01-03T14:15")), (Some(14), Some(2)));
        assert_eq!(time_features(Some("2024-01-03T14:15:30")), (Some(14), Some(2)));
        assert_eq!(time_features(Some("2024-01-07 09:00")), (Some(9), Some(6)));
    }

    #[test]
    fn time_features_keep_offset_wall_clock() {
        assert_eq!(
            time_features(Some("2024-01-01T23:30:00+05:00")),
            (Some(23), Some(0))
        );
        assert_eq!(time_features(Some("2024-01-01T08:00+01:00")), (Some(8), Some(0)));
        assert_eq!(time_features(Some("2024-01-01")), (Some(0), Some(0)));
    }

    #[test]
    fn time_features_degrade_to_null() {
        assert_eq!(time_features(None), (None, None));
        assert_eq!(time_features(Some("yesterday noon")), (None, None));
        assert_eq!(time_features(Some("")), (None, None));
    }

    #[test]
    fn assemble_leaves_sentiment_empty() {
        let data: MarketData = serde_json::from_value(serde_json::json!({
            "stores": [{
                "primaryType": "cafe",
                "rating": 4.5,
                "location": {"latitude": 40.0, "longitude": -73.0},
                "reviews": [{"text": {"text": "great"}}]
            }],
            "weather": {"current": {"time": "2024-01-03T14:15"}}
        }))
        .unwrap();
        let v = FeatureVectorAssembler::default().assemble(&data).unwrap();
        assert!(v.store_sentiment.is_empty());
        assert_eq!(v.spatial_density, 1);
        assert_eq!(v.campaign_suitability_score, 4.5);
        assert_eq!((v.hour_of_day, v.day_of_week), (Some(14), Some(2)));
    }
}
