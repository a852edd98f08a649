//! quake-watch binary entrypoint.
//! Loads the feed config, starts the refresh timers, and serves the board.

use std::sync::Arc;

use quake_watch::feed::fetch::HttpFetcher;
use quake_watch::metrics::Metrics;
use quake_watch::{load_config_default, router, spawn_watch};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - QUAKE_WATCH_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("QUAKE_WATCH_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quake_watch=info,warn"));

    // The shuttle runtime may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = load_config_default()?;
    let plan = config.plan()?;
    let metrics = Metrics::init(&plan)?;

    let watch = spawn_watch(&config, Arc::new(HttpFetcher::new()))?;
    let state = watch.app_state().with_metrics(metrics.handle.clone());

    Ok(router(state).into())
}
