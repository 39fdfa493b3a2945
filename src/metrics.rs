use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shuttle_axum::axum::{routing::get, Router};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the pipeline series.
    pub fn init() -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        describe_counter!("pipeline_runs_total", "Feature pipeline runs started");
        describe_counter!(
            "pipeline_errors_total",
            "Feature pipeline runs rejected for inconsistent input"
        );
        describe_histogram!(
            "pipeline_build_ms",
            Unit::Milliseconds,
            "Time to build one feature vector"
        );
        describe_counter!(
            "campaign_generation_errors_total",
            "Campaign drafts that failed or did not parse"
        );
        describe_counter!(
            "campaign_refine_fallback_total",
            "Refinements discarded in favor of the draft"
        );

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
