use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::orchestrator::{EvaluationRun, SlaEngine, TriggerResponse};
use crate::record::EvaluationResult;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SlaEngine>,
}

impl AppState {
    pub fn new(engine: SlaEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Run the engine at `check_time` and publish metrics.
    pub async fn run_cycle(&self, check_time: DateTime<Utc>) -> EvaluationRun {
        let run = self.engine.run_at(check_time).await;
        crate::metrics::record_run(&run);
        run
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/evaluate", post(evaluate))
        .route("/status/latest", get(status_latest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Schedule event (e.g. an EventBridge/cron payload). Only logged.
#[derive(Debug, Default, serde::Deserialize)]
struct ScheduleEvent {
    #[serde(default)]
    source: Option<String>,
}

async fn evaluate(State(state): State<AppState>, body: axum::body::Bytes) -> Json<TriggerResponse> {
    let event: ScheduleEvent = serde_json::from_slice(&body).unwrap_or_default();
    tracing::debug!(target: "sla", trigger = ?event.source, "evaluation triggered");

    let run = state.run_cycle(Utc::now()).await;
    Json(run.into_trigger_response())
}

#[derive(serde::Serialize)]
struct LatestOut {
    check_time: Option<DateTime<Utc>>,
    results: Vec<EvaluationResult>,
}

/// Read-through over the persisted `latest.json` of each registered source.
async fn status_latest(
    State(state): State<AppState>,
) -> Result<Json<LatestOut>, (StatusCode, String)> {
    let results = state.engine.latest_persisted().await.map_err(|e| {
        warn!(target: "sla", error = %e, "reading persisted results failed");
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;
    let check_time = results.iter().map(|r| r.check_time_utc).max();
    Ok(Json(LatestOut {
        check_time,
        results,
    }))
}
