// src/orchestrator.rs
//! # Evaluation Orchestrator
//! One run = every registered source, in name order: discover → evaluate →
//! assemble → persist. Critical results are published in a single alert once
//! all sources are done.
//!
//! Failures stay local: a discovery error turns only that source into a
//! `missing` result with its cause, and persistence/alert errors are reported
//! on the run without dropping computed results.
//!
//! Before a result is written, the source's persisted `latest.json` is read
//! back. A later check time there is reported as clock skew; the new result
//! is still written.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::discovery::Discovery;
use crate::error::{SlaError, SlaResult};
use crate::notify::AlertSink;
use crate::persist::ResultSink;
use crate::record::{EvaluationResult, ObservedDelivery};
use crate::sla::{evaluate, RegisteredSource, RuleRegistry};

pub struct SlaEngine {
    rules: Arc<RuleRegistry>,
    tz: Tz,
    discovery: Arc<dyn Discovery>,
    sink: Arc<dyn ResultSink>,
    alerts: Arc<dyn AlertSink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertOutcome {
    NotNeeded,
    Sent { sources: usize },
    Failed { reason: String },
}

/// Everything one run produced, including collaborator failures.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRun {
    pub check_time: DateTime<Utc>,
    pub results: Vec<EvaluationResult>,
    pub persisted: Vec<String>,
    pub persist_failures: Vec<String>,
    /// One entry per source whose persisted result was newer than this run.
    pub clock_skew: Vec<String>,
    pub alert: AlertOutcome,
}

impl EvaluationRun {
    pub fn critical(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.results.iter().filter(|r| r.is_critical())
    }

    pub fn result_for(&self, source: &str) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.source == source)
    }

    pub fn into_trigger_response(self) -> TriggerResponse {
        TriggerResponse {
            status_code: 200,
            body: self.results,
        }
    }
}

/// Response shape of the scheduled trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status_code: u16,
    pub body: Vec<EvaluationResult>,
}

impl SlaEngine {
    pub fn new(
        rules: Arc<RuleRegistry>,
        tz: Tz,
        discovery: Arc<dyn Discovery>,
        sink: Arc<dyn ResultSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            rules,
            tz,
            discovery,
            sink,
            alerts,
        }
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn run_now(&self) -> EvaluationRun {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, check_time: DateTime<Utc>) -> EvaluationRun {
        let mut results = Vec::with_capacity(self.rules.len());
        let mut persisted = Vec::new();
        let mut persist_failures = Vec::new();
        let mut clock_skew = Vec::new();

        for src in self.rules.iter() {
            let result = self.evaluate_source(src, check_time).await;

            if let Some(skew) = self.persisted_skew(&src.name, check_time).await {
                warn!(target: "sla::orchestrator", source = %src.name, error = %skew, "clock skew against persisted result");
                clock_skew.push(format!("{}: {skew}", src.name));
            }

            let key = result.partition_key();
            match self.sink.write(&key, &result).await {
                Ok(()) => persisted.push(key.to_string()),
                Err(e) => {
                    warn!(target: "sla::orchestrator", source = %src.name, error = %e, "persist failed");
                    persist_failures.push(e.to_string());
                }
            }

            results.push(result);
        }

        let critical: Vec<EvaluationResult> =
            results.iter().filter(|r| r.is_critical()).cloned().collect();
        let alert = if critical.is_empty() {
            AlertOutcome::NotNeeded
        } else {
            match self.alerts.publish(&critical).await {
                Ok(()) => AlertOutcome::Sent {
                    sources: critical.len(),
                },
                Err(e) => {
                    warn!(target: "sla::orchestrator", error = %e, "critical alert failed");
                    AlertOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        info!(
            target: "sla::orchestrator",
            %check_time,
            sources = results.len(),
            critical = critical.len(),
            persist_failures = persist_failures.len(),
            clock_skew = clock_skew.len(),
            "evaluation run complete"
        );

        EvaluationRun {
            check_time,
            results,
            persisted,
            persist_failures,
            clock_skew,
            alert,
        }
    }

    /// Latest persisted result of every registered source, in name order.
    /// Sources that were never written are left out.
    pub async fn latest_persisted(&self) -> SlaResult<Vec<EvaluationResult>> {
        let mut out = Vec::with_capacity(self.rules.len());
        for src in self.rules.iter() {
            if let Some(r) = self.sink.read_latest(&src.name).await? {
                out.push(r);
            }
        }
        Ok(out)
    }

    async fn persisted_skew(&self, source: &str, check_time: DateTime<Utc>) -> Option<SlaError> {
        match self.sink.read_latest(source).await {
            Ok(Some(prev)) if prev.check_time_utc > check_time => Some(SlaError::ClockSkew {
                previous: prev.check_time_utc,
                current: check_time,
            }),
            Ok(_) => None,
            Err(e) => {
                warn!(target: "sla::orchestrator", source, error = %e, "could not read persisted result");
                None
            }
        }
    }

    async fn evaluate_source(&self, src: &RegisteredSource, check_time: DateTime<Utc>) -> EvaluationResult {
        let (observed, error) = match self.discovery.find_latest(&src.prefix).await {
            Ok(o) => (o, None),
            Err(e) => {
                warn!(target: "sla::orchestrator", source = %src.name, error = %e, "discovery failed, reporting missing");
                (ObservedDelivery::none(), Some(e.to_string()))
            }
        };

        let assessment = evaluate(&src.rule, &observed, check_time, &self.tz);
        tracing::debug!(
            target: "sla::orchestrator",
            source = %src.name,
            status = %assessment.status,
            delay_minutes = ?assessment.delay_minutes,
            score = assessment.freshness_score,
            "source evaluated"
        );

        EvaluationResult::assemble(&src.name, check_time, observed, assessment, error, &self.tz)
    }
}
