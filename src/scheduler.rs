// src/scheduler.rs
use chrono::Utc;
use tokio::task::JoinHandle;

use crate::api::AppState;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn the periodic evaluation trigger. Returns `None` when disabled (`interval_secs == 0`).
pub fn spawn_scheduler(state: AppState, cfg: SchedulerCfg) -> Option<JoinHandle<()>> {
    if cfg.interval_secs == 0 {
        tracing::info!(target: "sla", "scheduler disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let run = state.run_cycle(Utc::now()).await;

            tracing::info!(
                target: "sla",
                sources = run.results.len(),
                critical = run.critical().count(),
                persist_failures = run.persist_failures.len(),
                "scheduled evaluation tick"
            );
        }
    }))
}
