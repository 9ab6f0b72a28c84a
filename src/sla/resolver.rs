// src/sla/resolver.rs
//! Expected-time resolver: the most recent delivery deadline at or before a
//! given evaluation instant.
//!
//! Daily and weekly anchors are local wall-clock times. Stepping back is done
//! on calendar dates and re-localized afterwards, so every candidate picks up
//! the UTC offset valid on its own day.

use chrono::{
    DateTime, Datelike, Days, LocalResult, NaiveDate, TimeDelta, TimeZone, Timelike, Utc,
};

use super::rules::{AnchorTime, Cadence, CadenceRule};

/// Upper bound when walking out of a spring-forward gap.
const MAX_GAP_MINUTES: u32 = 24 * 60;

/// Resolve the deadline that applies to `check_time` under `rule`.
///
/// Hourly deadlines are computed in UTC for the hour containing `check_time`
/// and may lie in the future. Daily/weekly deadlines are never after
/// `check_time`; an exact match counts as already passed.
pub fn resolve_expected_time<Z: TimeZone>(
    rule: &CadenceRule,
    check_time: DateTime<Utc>,
    tz: &Z,
) -> DateTime<Utc> {
    match rule.cadence() {
        Cadence::Hourly {
            expected_within_minutes,
        } => start_of_hour(check_time) + TimeDelta::minutes(i64::from(expected_within_minutes)),
        Cadence::Daily { anchor } => {
            let today = check_time.with_timezone(tz).date_naive();
            let candidate = localize(tz, today, anchor);
            if check_time < candidate {
                localize(tz, today - Days::new(1), anchor)
            } else {
                candidate
            }
        }
        Cadence::Weekly { weekday, anchor } => {
            let today = check_time.with_timezone(tz).date_naive();
            let back = (today.weekday().num_days_from_monday() + 7
                - weekday.num_days_from_monday())
                % 7;
            let day = today - Days::new(u64::from(back));
            let candidate = localize(tz, day, anchor);
            if check_time < candidate {
                localize(tz, day - Days::new(7), anchor)
            } else {
                candidate
            }
        }
    }
}

fn start_of_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t - TimeDelta::seconds(i64::from(t.minute() * 60 + t.second()))
        - TimeDelta::nanoseconds(i64::from(t.nanosecond()))
}

/// Anchor on `date` in `tz`, as a UTC instant.
/// Ambiguous local times take the earlier instant; skipped ones move to the
/// first valid minute after the gap.
fn localize<Z: TimeZone>(tz: &Z, date: NaiveDate, anchor: AnchorTime) -> DateTime<Utc> {
    let wall = date.and_time(anchor.as_naive_time());
    let mut naive = wall;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => naive += TimeDelta::minutes(1),
        }
    }
    tz.from_utc_datetime(&wall).with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn hourly_truncates_subsecond_precision() {
        let rule = CadenceRule::hourly(15, 30, 120, true).unwrap();
        let check = utc(2025, 3, 4, 10, 59) + TimeDelta::milliseconds(59_999);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 3, 4, 10, 15));
    }

    #[test]
    fn daily_spring_forward_gap_moves_past_gap() {
        // 2025-03-09 02:30 does not exist in New York; first valid minute is 03:00 EDT.
        let rule = CadenceRule::daily(2, 30, 60, 240, true).unwrap();
        let check = utc(2025, 3, 9, 12, 0);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 3, 9, 7, 0));
    }

    #[test]
    fn daily_fall_back_overlap_takes_earlier_instant() {
        // 2025-11-02 01:30 happens twice; EDT (UTC-4) comes first.
        let rule = CadenceRule::daily(1, 30, 60, 240, true).unwrap();
        let check = utc(2025, 11, 2, 12, 0);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 11, 2, 5, 30));
    }

    #[test]
    fn daily_step_back_across_dst_keeps_wall_clock() {
        // Monday 2025-03-10 08:00 EDT is before the 09:00 anchor, so the
        // deadline is Sunday 09:00 EDT (first day after the switch).
        let rule = CadenceRule::daily(9, 0, 60, 240, true).unwrap();
        let check = utc(2025, 3, 10, 12, 0);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 3, 9, 13, 0));

        // Sunday 2025-03-09 at 08:00 EDT steps back to Saturday 09:00 EST.
        let check = utc(2025, 3, 9, 12, 0);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 3, 8, 14, 0));
    }

    #[test]
    fn weekly_full_week_step_uses_previous_offset() {
        // Monday 2025-03-10 09:00 EDT, anchor Monday 10:00 → previous Monday
        // 2025-03-03 10:00 EST (UTC-5), not a fixed 168h back.
        let rule = CadenceRule::weekly(0, 10, 0, 360, 1440, false).unwrap();
        let check = utc(2025, 3, 10, 13, 0);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 3, 3, 15, 0));
    }

    #[test]
    fn weekly_on_anchor_day_after_anchor_is_same_day() {
        let rule = CadenceRule::weekly(0, 10, 0, 360, 1440, false).unwrap();
        // Monday 2025-06-02 11:00 EDT
        let check = utc(2025, 6, 2, 15, 0);
        let exp = resolve_expected_time(&rule, check, &New_York);
        assert_eq!(exp, utc(2025, 6, 2, 14, 0));
    }

    #[test]
    fn weekly_sunday_anchor_from_saturday() {
        let rule = CadenceRule::weekly(6, 0, 0, 10, 20, true).unwrap();
        // Saturday 2025-06-07 12:00 UTC with a UTC calendar.
        let exp = resolve_expected_time(&rule, utc(2025, 6, 7, 12, 0), &Utc);
        assert_eq!(exp, utc(2025, 6, 1, 0, 0));
    }
}
