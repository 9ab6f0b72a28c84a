// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod persist;
pub mod record;
pub mod scheduler;
pub mod sla;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::{SlaError, SlaResult};
pub use crate::orchestrator::{EvaluationRun, SlaEngine, TriggerResponse};
pub use crate::record::{EvaluationResult, ObservedDelivery, SlaStatus};

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::discovery::ObjectStoreDiscovery;
use crate::notify::NotifierMux;
use crate::persist::ObjectStoreSink;

/// Wire the engine from configuration: rules file, object stores, alert channels.
/// Any invalid setting is returned as `ConfigurationInvalid`.
pub fn build_engine(cfg: &AppConfig) -> SlaResult<SlaEngine> {
    let rules = config::load_rules_default()?;
    let discovery =
        ObjectStoreDiscovery::new(cfg.raw_store.build()?).with_timeout(cfg.discovery_timeout_secs);
    let sink = ObjectStoreSink::new(cfg.results_store.build()?);
    let alerts = NotifierMux::from_env()?;

    info!(
        target: "sla",
        sources = rules.len(),
        timezone = %cfg.timezone,
        alert_channels = ?alerts.channel_names(),
        "SLA engine configured"
    );

    Ok(SlaEngine::new(
        Arc::new(rules),
        cfg.timezone,
        Arc::new(discovery),
        Arc::new(sink),
        Arc::new(alerts),
    ))
}

/// Install a compact `tracing` subscriber (`RUST_LOG`, default `sla=info,warn`).
/// A no-op when a subscriber is already installed.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sla=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
