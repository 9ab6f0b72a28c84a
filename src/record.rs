// src/record.rs
//! Result record model: what discovery hands in and what the engine hands out
//! to persistence, alerting and the read-side API.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sla::evaluator::Assessment;

/// Latest object seen for a feed. `latest_time == None` means nothing was ever delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDelivery {
    pub latest_time: Option<DateTime<Utc>>,
    pub latest_identifier: Option<String>,
}

impl ObservedDelivery {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at(latest_time: DateTime<Utc>, identifier: impl Into<String>) -> Self {
        Self {
            latest_time: Some(latest_time),
            latest_identifier: Some(identifier.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTime,
    SlightlyLate,
    CriticallyLate,
    Missing,
}

impl SlaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaStatus::OnTime => "on_time",
            SlaStatus::SlightlyLate => "slightly_late",
            SlaStatus::CriticallyLate => "critically_late",
            SlaStatus::Missing => "missing",
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluation of one feed at one instant. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub source: String,
    pub check_time_utc: DateTime<Utc>,
    pub check_time_local: String,
    pub expected_by_utc: Option<DateTime<Utc>>,
    pub expected_by_local: Option<String>,
    pub latest_object_time_utc: Option<DateTime<Utc>>,
    pub latest_object_time_local: Option<String>,
    pub latest_object_key: Option<String>,
    pub status: SlaStatus,
    pub delay_minutes: Option<i64>,
    pub freshness_score: u8,
    /// Why the observation is unavailable, when discovery failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResult {
    pub fn assemble<Z>(
        source: &str,
        check_time: DateTime<Utc>,
        observed: ObservedDelivery,
        assessment: Assessment,
        error: Option<String>,
        tz: &Z,
    ) -> Self
    where
        Z: TimeZone,
        Z::Offset: fmt::Display,
    {
        Self {
            source: source.to_string(),
            check_time_utc: check_time,
            check_time_local: render_local(check_time, tz),
            expected_by_utc: assessment.expected_time,
            expected_by_local: assessment.expected_time.map(|t| render_local(t, tz)),
            latest_object_time_utc: observed.latest_time,
            latest_object_time_local: observed.latest_time.map(|t| render_local(t, tz)),
            latest_object_key: observed.latest_identifier,
            status: assessment.status,
            delay_minutes: assessment.delay_minutes,
            freshness_score: assessment.freshness_score,
            error,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.status == SlaStatus::CriticallyLate
    }

    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(&self.source, self.check_time_utc)
    }
}

fn render_local<Z>(t: DateTime<Utc>, tz: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    t.with_timezone(tz).to_rfc3339()
}

/// Storage key for a result: source plus the UTC hour partition of the check time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    source: String,
    check_time: DateTime<Utc>,
}

impl PartitionKey {
    pub fn new(source: &str, check_time: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            check_time,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// `metrics/source=<s>/year=YYYY/month=MM/day=DD/hour=HH/sla_result.json`
    pub fn object_path(&self) -> String {
        format!(
            "metrics/source={}/{}/sla_result.json",
            self.source,
            self.check_time.format("year=%Y/month=%m/day=%d/hour=%H")
        )
    }

    /// Rolling pointer to the newest result for the source.
    pub fn latest_path(&self) -> String {
        latest_result_path(&self.source)
    }
}

/// `metrics/<source>/latest.json`, the newest result written for a source.
pub fn latest_result_path(source: &str) -> String {
    format!("metrics/{source}/latest.json")
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object_path())
    }
}
