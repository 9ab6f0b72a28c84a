//! Feed SLA Monitor — Binary Entrypoint
//! Boots the Axum HTTP server (trigger + read-side routes, /metrics) and the
//! periodic evaluation scheduler.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use feed_sla_monitor::config::AppConfig;
use feed_sla_monitor::metrics::Metrics;
use feed_sla_monitor::scheduler::{spawn_scheduler, SchedulerCfg};
use feed_sla_monitor::{build_engine, init_tracing, router, AppState};

/// Enable local tracing only outside Shuttle's managed runtime.
/// Activation requires dev environment (debug build OR SHUTTLE_ENV in {local, development, dev}).
fn enable_dev_tracing() {
    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if is_dev_env {
        init_tracing();
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    // Invalid rules/timezone/stores are fatal here.
    let cfg = AppConfig::from_env().context("loading SLA configuration")?;
    let engine = build_engine(&cfg).context("building SLA engine")?;
    let metrics = Metrics::init()?;

    let state = AppState::new(engine);
    spawn_scheduler(
        state.clone(),
        SchedulerCfg {
            interval_secs: cfg.check_interval_secs,
        },
    );

    let app = router(state).merge(metrics.router());
    Ok(app.into())
}
