//! Quake alert service: binary entrypoint.
//! Loads settings and credentials, starts the feed poller, and serves the HTTP API.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quake_alerts::Settings;

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quake_alerts=info,poller=info,notify=info,tower_http=info,warn"));

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

    let settings = Settings::load().context("loading settings")?;
    tracing::info!(
        port = settings.port,
        poll_interval_secs = settings.poll_interval_secs,
        topic = %settings.alert.topic,
        metrics = settings.metrics_enabled,
        dry_run = settings.notify_dry_run,
        "settings loaded"
    );

    let service = quake_alerts::build(&settings)?;
    let _poller = service.poller.clone().spawn(settings.poll_interval());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port))
        .await
        .with_context(|| format!("binding port {}", settings.port))?;
    tracing::info!("server running on http://localhost:{}", settings.port);

    axum::serve(listener, service.router)
        .await
        .context("http server")?;
    Ok(())
}
