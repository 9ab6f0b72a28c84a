// src/sla/evaluator.rs
//! # Status & Score Evaluator
//! Pure mapping `(rule, observation, check time)` → status, delay, score.
//! No I/O, suitable for unit tests and offline replays.
//!
//! Policy: delay is measured from the resolved deadline to the delivery,
//! weekly feeds fall back to raw age once they are more than a week old,
//! and optional feeds never score below half credit.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use super::resolver::resolve_expected_time;
use super::rules::CadenceRule;
use crate::record::{ObservedDelivery, SlaStatus};

const FULL_SCORE: u8 = 100;
const OPTIONAL_FLOOR: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub status: SlaStatus,
    pub delay_minutes: Option<i64>,
    pub freshness_score: u8,
    pub expected_time: Option<DateTime<Utc>>,
}

pub fn evaluate<Z: TimeZone>(
    rule: &CadenceRule,
    observed: &ObservedDelivery,
    check_time: DateTime<Utc>,
    tz: &Z,
) -> Assessment {
    let Some(latest) = observed.latest_time else {
        return Assessment {
            status: SlaStatus::Missing,
            delay_minutes: None,
            freshness_score: if rule.required() { 0 } else { OPTIONAL_FLOOR },
            expected_time: None,
        };
    };

    let expected = resolve_expected_time(rule, check_time, tz);
    let mut delay = floor_minutes(expected - latest).max(0);

    if let Some(guard) = rule.cadence().staleness_guard_minutes() {
        let age = floor_minutes(check_time - latest);
        if age > guard {
            delay = age;
        }
    }

    let status = classify(
        delay,
        rule.late_threshold_minutes(),
        rule.critical_threshold_minutes(),
    );

    Assessment {
        status,
        delay_minutes: Some(delay),
        freshness_score: score(status, delay, rule.required()),
        expected_time: Some(expected),
    }
}

/// Whole minutes, rounded toward negative infinity.
pub fn floor_minutes(d: TimeDelta) -> i64 {
    d.num_milliseconds().div_euclid(60_000)
}

/// Two visible late tiers: anything up to and including `critical` is
/// `SlightlyLate`, only delays past `critical` escalate.
pub fn classify(delay_minutes: i64, late: u32, critical: u32) -> SlaStatus {
    if delay_minutes <= 0 {
        SlaStatus::OnTime
    } else if delay_minutes <= i64::from(late) {
        SlaStatus::SlightlyLate
    } else if delay_minutes > i64::from(critical) {
        SlaStatus::CriticallyLate
    } else {
        SlaStatus::SlightlyLate
    }
}

/// 10 points per 10 minutes of delay, floored at 0 (50 for optional feeds).
pub fn score(status: SlaStatus, delay_minutes: i64, required: bool) -> u8 {
    let raw = match status {
        SlaStatus::OnTime => FULL_SCORE,
        SlaStatus::Missing => 0,
        SlaStatus::SlightlyLate | SlaStatus::CriticallyLate => {
            let penalty = (delay_minutes.max(0) / 10).min(i64::from(FULL_SCORE));
            // penalty is within 0..=100
            FULL_SCORE - penalty as u8
        }
    };
    if required {
        raw
    } else {
        raw.max(OPTIONAL_FLOOR)
    }
}
