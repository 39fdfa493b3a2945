use std::sync::Arc;

use serde_json::json;
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::campaign::{CampaignContext, CampaignPlanner};
use crate::error::{CampaignError, PipelineError};
use crate::features::{FeaturePipeline, FeatureReport, FeatureVector};
use crate::places::MarketData;
use crate::snapshot::SnapshotWriter;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FeaturePipeline>,
    pub planner: CampaignPlanner,
    pub snapshots: Option<SnapshotWriter>,
}

impl AppState {
    fn run_pipeline(&self, data: &MarketData) -> Result<FeatureReport, ApiError> {
        let report = self.pipeline.run(data)?;
        if let Some(w) = &self.snapshots {
            // off the request path
            let _ = w.spawn_best_effort(report.clone());
        }
        Ok(report)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/features", post(features))
        .route("/recommend", post(recommend))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// HTTP-facing failure.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Pipeline(PipelineError),
    Campaign(CampaignError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<CampaignError> for ApiError {
    fn from(e: CampaignError) -> Self {
        ApiError::Campaign(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Pipeline(e) if e.is_data_integrity() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "inconsistent input data", "details": e.to_string() }),
            ),
            ApiError::Pipeline(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "feature pipeline failed", "details": e.to_string() }),
            ),
            ApiError::Campaign(e) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "campaign generation failed", "details": e.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn features(
    State(state): State<AppState>,
    Json(data): Json<MarketData>,
) -> Result<Json<FeatureVector>, ApiError> {
    let report = state.run_pipeline(&data)?;
    Ok(Json(report.vector))
}

#[derive(serde::Deserialize)]
struct RecommendParams {
    #[serde(default)]
    store_type: Option<String>,
}

async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
    Json(data): Json<MarketData>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store_type = params
        .store_type
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("missing required parameter 'store_type'".to_string())
        })?;

    info!(
        zipcode = data.zipcode.as_deref().unwrap_or("-"),
        store_type = %store_type,
        "campaign requested"
    );

    let report = state.run_pipeline(&data)?;
    let ctx = CampaignContext::now();
    let campaign = state
        .planner
        .recommend(&store_type, &report, &ctx)
        .await
        .inspect_err(|e| error!(error = %e, "campaign generation failed"))?;
    Ok(Json(campaign))
}
