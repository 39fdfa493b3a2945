//! Offline run of the feature pipeline over a saved `{zipcode, stores, weather}` payload.
//!
//! Usage: `build_features <input.json> [snapshot_dir]`
//! The feature vector goes to stdout; logs go to stderr (`LOG_FORMAT=json` for JSON lines).

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use campaign_features::config::pipeline::PipelineSettings;
use campaign_features::snapshot::SnapshotWriter;
use campaign_features::{FeaturePipeline, FeatureVectorAssembler, MarketData};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campaign_features=info,warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .context("usage: build_features <input.json> [snapshot_dir]")?;
    let snapshot_dir = args.next();

    let raw = fs::read_to_string(&input).with_context(|| format!("reading {input}"))?;
    let data: MarketData =
        serde_json::from_str(&raw).with_context(|| format!("parsing {input}"))?;

    let settings = PipelineSettings::load()?;
    let pipeline = FeaturePipeline::new(
        FeatureVectorAssembler::from_settings(&settings),
        Arc::new(settings.analyzer()?),
    );
    let report = pipeline.run(&data)?;

    let writer = snapshot_dir
        .map(SnapshotWriter::new)
        .or_else(|| settings.snapshot_dir().map(SnapshotWriter::new));
    if let Some(w) = writer {
        w.write_report(&report)
            .with_context(|| format!("writing snapshots to {}", w.dir().display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&report.vector)?);
    Ok(())
}
