// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod campaign;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod normalize;
pub mod places;
pub mod sentiment;
pub mod snapshot;
pub mod stores;
pub mod weather;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::{CampaignError, PipelineError};
pub use crate::features::{FeaturePipeline, FeatureReport, FeatureVector, FeatureVectorAssembler};
pub use crate::normalize::{normalize, ScaleMethod};
pub use crate::places::{MarketData, PlaceRecord};
pub use crate::sentiment::{SentimentAnalyzer, SentimentResult};
pub use crate::stores::{AggregatedStoreMetrics, StoreFeatureBuilder};
pub use crate::weather::{WeatherFeatureBuilder, WeatherFeatures};

use std::sync::Arc;

use crate::campaign::CampaignPlanner;
use crate::config::{ai::AiConfig, pipeline::PipelineSettings};
use crate::snapshot::SnapshotWriter;

/// Wire settings into a ready [`AppState`]. Fails only on an unreadable lexicon.
pub fn build_state(settings: &PipelineSettings, ai: &AiConfig) -> anyhow::Result<AppState> {
    let analyzer = Arc::new(settings.analyzer()?);
    let pipeline = FeaturePipeline::new(FeatureVectorAssembler::from_settings(settings), analyzer);
    Ok(AppState {
        pipeline: Arc::new(pipeline),
        planner: CampaignPlanner::from_config(ai),
        snapshots: settings.snapshot_dir().map(SnapshotWriter::new),
    })
}
