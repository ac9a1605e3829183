use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_runs_total", "Pipeline runs started.");
        describe_counter!("relay_published_total", "Notices delivered to the channel.");
        describe_counter!(
            "relay_duplicates_total",
            "Runs that stopped because the notice id was already published."
        );
        describe_counter!("relay_failures_total", "Failed runs, labelled by stage.");
        describe_counter!("relay_feed_errors_total", "Feed/page HTTP errors.");
        describe_counter!(
            "relay_lines_filtered_total",
            "OCR lines dropped for low confidence or blank text."
        );
        describe_counter!(
            "relay_lines_misaligned_total",
            "OCR lines rejected by the baseline alignment gate."
        );
        describe_histogram!("relay_run_ms", "Pipeline run duration in milliseconds.");
        describe_histogram!("relay_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("relay_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Only one per process.
    pub fn init() -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    /// `/metrics` (Prometheus exposition format) and `/healthz`.
    pub fn router(&self) -> Router {
        router_for(self.handle.clone())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics listener on {addr}"))?;
        tracing::info!(target: "metrics", %addr, "serving /metrics");
        axum::serve(listener, self.router())
            .await
            .context("metrics server")
    }
}

pub fn router_for(handle: PrometheusHandle) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
        .route("/healthz", get(|| async { "ok" }))
}
