use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::orchestrator::{AlertOutcome, EvaluationRun};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process).
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
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

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sla_runs_total", "Completed evaluation runs.");
        describe_counter!("sla_results_total", "Per-source results by status.");
        describe_counter!(
            "sla_discovery_errors_total",
            "Sources degraded to missing because discovery failed."
        );
        describe_counter!("sla_persist_errors_total", "Result writes that failed.");
        describe_counter!("sla_alerts_sent_total", "Critical alert batches published.");
        describe_counter!("sla_alert_errors_total", "Critical alert batches that failed.");
        describe_counter!(
            "sla_clock_skew_total",
            "Sources whose persisted result had a later check time than the run."
        );
        describe_gauge!("sla_freshness_score", "Latest freshness score per source.");
        describe_gauge!("sla_last_run_ts", "Unix ts of the last evaluation run.");
    });
}

pub(crate) fn record_run(run: &EvaluationRun) {
    ensure_metrics_described();
    counter!("sla_runs_total").increment(1);
    gauge!("sla_last_run_ts").set(run.check_time.timestamp() as f64);

    for r in &run.results {
        counter!("sla_results_total", "status" => r.status.as_str()).increment(1);
        gauge!("sla_freshness_score", "source" => r.source.clone()).set(f64::from(r.freshness_score));
        if r.error.is_some() {
            counter!("sla_discovery_errors_total").increment(1);
        }
    }
    counter!("sla_persist_errors_total").increment(run.persist_failures.len() as u64);
    counter!("sla_clock_skew_total").increment(run.clock_skew.len() as u64);

    match run.alert {
        AlertOutcome::Sent { .. } => counter!("sla_alerts_sent_total").increment(1),
        AlertOutcome::Failed { .. } => counter!("sla_alert_errors_total").increment(1),
        AlertOutcome::NotNeeded => {}
    }
}
