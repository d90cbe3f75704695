//! Topic Coverage Service: binary entrypoint.
//! Boots the Axum HTTP server: scoring engine, session routes, metrics and optional debug routes.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_coverage::metrics::Metrics;

const DEFAULT_PORT: u16 = 8000;

/// Tracing setup. `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_coverage=info,coverage=info,warn"));

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
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let engine = topic_coverage::engine_from_env().context("building scoring engine")?;

    let mut router = topic_coverage::app(engine.clone(), topic_coverage::debug_routes_enabled());
    match Metrics::init(engine.config().semantic_threshold) {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => warn!(error = %e, "prometheus recorder not installed; /metrics disabled"),
    }

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, "topic coverage service listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
