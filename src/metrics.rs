use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_ticks_total", "Poll ticks started.");
        describe_counter!(
            "feed_ticks_skipped_total",
            "Timer fires dropped because a tick was still running."
        );
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse failures.");
        describe_counter!("feed_entries_total", "Entries parsed from the feed.");
        describe_counter!("feed_items_new_total", "Items found past the cursor.");
        describe_counter!("notify_errors_total", "Chat posts that failed.");
        describe_counter!(
            "sentiment_classify_errors_total",
            "Classifier calls that failed or returned garbage."
        );
        describe_counter!(
            "sentiment_filtered_total",
            "Classified items dropped by the symbol allow-list."
        );
        describe_counter!("ledger_write_errors_total", "Failed ledger upserts.");
        describe_counter!("sentiment_flips_total", "BUY/SELL reversals detected.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("feed_last_tick_ts", "Unix ts when the last tick finished.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// `/health` and `/metrics` (Prometheus exposition format).
    pub fn router(&self) -> Router {
        router_for(self.handle.clone())
    }

    /// Serve the router on `addr` in a background task.
    pub async fn serve(&self, addr: SocketAddr) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = self.router();
        tracing::info!(%addr, "metrics endpoint listening");
        Ok(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "metrics server stopped");
            }
        }))
    }
}

pub fn router_for(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
}
