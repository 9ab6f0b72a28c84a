// src/notify/mod.rs
//! Alert dispatch for critically late feeds.
//!
//! The orchestrator hands every critical result of a run to one
//! `AlertSink::publish` call. `NotifierMux` renders them into a single
//! `CriticalAlert` and fans it out to whichever channels are configured.

pub mod discord;
pub mod email;
pub mod slack;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{SlaError, SlaResult};
use crate::record::EvaluationResult;

pub const ALERT_SUBJECT: &str = "SLA ALERT: critically_late";
const ALERT_HEADLINE: &str = "CRITICAL SLA BREACH DETECTED";

/// Alert collaborator used by the orchestrator.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, critical: &[EvaluationResult]) -> SlaResult<()>;
}

/// A single delivery channel (Slack, Discord, email…).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &CriticalAlert) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Rendered alert: one subject, one line per breached feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalAlert {
    pub subject: String,
    pub lines: Vec<String>,
}

impl CriticalAlert {
    pub fn from_results(results: &[EvaluationResult]) -> Self {
        let lines = results
            .iter()
            .map(|r| {
                format!(
                    "{} | delay={} min | score={} | file={}",
                    r.source,
                    r.delay_minutes
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "n/a".into()),
                    r.freshness_score,
                    r.latest_object_key.as_deref().unwrap_or("none"),
                )
            })
            .collect();
        Self {
            subject: ALERT_SUBJECT.to_string(),
            lines,
        }
    }

    pub fn body(&self) -> String {
        let mut out = String::from(ALERT_HEADLINE);
        for l in &self.lines {
            out.push('\n');
            out.push_str(l);
        }
        out
    }
}

/// Fan-out over configured channels. No channels → publishing is a no-op.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Channels enabled by env:
    /// - `SLA_SLACK_WEBHOOK_URL`
    /// - `SLA_DISCORD_WEBHOOK_URL`
    /// - `SMTP_HOST` (+ `SMTP_USER`, `SMTP_PASS`, `SLA_ALERT_EMAIL_FROM`, `SLA_ALERT_EMAIL_TO`)
    pub fn from_env() -> SlaResult<Self> {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(s) = slack::SlackNotifier::from_env() {
            channels.push(Box::new(s));
        }
        if let Some(d) = discord::DiscordNotifier::from_env() {
            channels.push(Box::new(d));
        }
        if let Some(e) = email::EmailSender::from_env()
            .map_err(|e| SlaError::config(format!("email alerts: {e:#}")))?
        {
            channels.push(Box::new(e));
        }
        Ok(Self { channels })
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

#[async_trait]
impl AlertSink for NotifierMux {
    async fn publish(&self, critical: &[EvaluationResult]) -> SlaResult<()> {
        if critical.is_empty() {
            return Ok(());
        }
        if self.channels.is_empty() {
            tracing::debug!(target: "sla::notify", "no alert channel configured, skipping");
            return Ok(());
        }

        let alert = CriticalAlert::from_results(critical);
        let mut failures = Vec::new();
        for ch in &self.channels {
            match ch.send(&alert).await {
                Ok(()) => {
                    tracing::info!(target: "sla::notify", channel = ch.name(), sources = critical.len(), "alert sent")
                }
                Err(e) => {
                    tracing::warn!(target: "sla::notify", channel = ch.name(), error = %format!("{e:#}"), "alert channel failed");
                    failures.push(format!("{}: {e:#}", ch.name()));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SlaError::AlertFailure(failures.join("; ")))
        }
    }
}
