//! Feed relay — binary entrypoint.
//! Loads configuration, wires the components and runs the poll scheduler until Ctrl-C.

use std::process::ExitCode;

use feed_sentiment_relay::app::AppContext;
use feed_sentiment_relay::config::AppConfig;
use feed_sentiment_relay::metrics::{ensure_metrics_described, Metrics};
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_sentiment_relay=info,ingest=info,notify=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "relay failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let _metrics_server = match config.metrics_addr {
        Some(addr) => {
            let m = Metrics::init()?;
            Some(m.serve(addr).await?)
        }
        None => {
            ensure_metrics_described();
            None
        }
    };

    let ctx = AppContext::build(config).await?;
    if let Err(e) = ctx.ledger.compact().await {
        tracing::warn!(error = %e, "ledger compaction failed; continuing with the full log");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "no Ctrl-C handler; running until killed");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    ctx.scheduler().run(shutdown_rx).await;
    Ok(())
}
