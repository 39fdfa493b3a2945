//! Campaign features service: binary entrypoint.
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use campaign_features::config::{ai::AiConfig, pipeline::PipelineSettings};
use campaign_features::metrics::Metrics;
use campaign_features::{build_state, create_router};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campaign_features=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let settings = PipelineSettings::load()?;
    let ai = AiConfig::load()?;
    let state = build_state(&settings, &ai)?;
    info!(
        provider = state.planner.provider_name(),
        snapshots = settings.snapshots.enabled,
        "campaign features service starting"
    );

    let metrics = Metrics::init()?;
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
