//! One-shot evaluation: runs every configured source once against the
//! configured stores and prints the trigger response as JSON.

use anyhow::Context;
use feed_sla_monitor::config::AppConfig;
use feed_sla_monitor::{build_engine, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env().context("loading SLA configuration")?;
    let engine = build_engine(&cfg).context("building SLA engine")?;

    let run = engine.run_now().await;
    for f in &run.persist_failures {
        tracing::warn!(target: "sla", "persist failure: {f}");
    }
    for s in &run.clock_skew {
        tracing::warn!(target: "sla", "{s}");
    }

    let response = run.into_trigger_response();
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("serialize response")?
    );
    Ok(())
}
