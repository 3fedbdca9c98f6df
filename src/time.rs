//! Minute arithmetic over the planning horizon.
//!
//! All model times are absolute minutes counted from midnight of the first
//! arrival day. Timetable rows carry calendar dates; unavailability windows
//! and shift rosters are given per weekday and have to be replayed onto every
//! week the horizon covers, which is where the one-or-two-occurrence
//! expansion below comes from.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub const MINUTES_PER_DAY: i32 = 24 * 60;
pub const SLOT_MINUTES: i32 = 15;

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok()
}

pub fn parse_hm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Absolute minute of a dated timetable event, relative to `origin` midnight.
pub fn event_minute(date: NaiveDate, time: NaiveTime, origin: NaiveDate) -> i32 {
    let days = (date - origin).num_days() as i32;
    days * MINUTES_PER_DAY + time.hour() as i32 * 60 + time.minute() as i32
}

/// Occurrences of a weekly `(weekday, minute-of-day)` point inside a horizon
/// of `horizon_days` days starting at `origin`.
///
/// Weekdays are 1 = Monday .. 7 = Sunday, as in the instance files. A horizon
/// longer than a week replays the point a second time seven days later;
/// planning runs never span more than two weeks, so two occurrences is all
/// that is ever needed.
pub fn weekly_minute(weekday: u32, time: NaiveTime, origin: NaiveDate, horizon_days: i32) -> Vec<i32> {
    let origin_weekday = origin.weekday().number_from_monday(); // 1..=7
    let mut rel = weekday as i32 - origin_weekday as i32;
    if rel < 0 {
        rel += 7;
    }
    let minute_of_day = time.hour() as i32 * 60 + time.minute() as i32;
    let first = rel * MINUTES_PER_DAY + minute_of_day;
    let mut out = Vec::new();
    if rel < horizon_days {
        out.push(first);
    }
    if rel + 7 < horizon_days {
        out.push(first + 7 * MINUTES_PER_DAY);
    }
    out
}

/// Expand a weekly `[start, end]` window into its concrete occurrences.
/// Start and end share the weekday, so occurrence k of the start pairs with
/// occurrence k of the end.
pub fn weekly_window(
    weekday: u32,
    start: NaiveTime,
    end: NaiveTime,
    origin: NaiveDate,
    horizon_days: i32,
) -> Vec<(i32, i32)> {
    let starts = weekly_minute(weekday, start, origin, horizon_days);
    let ends = weekly_minute(weekday, end, origin, horizon_days);
    starts.into_iter().zip(ends).collect()
}

/// Map an absolute minute back to calendar day and wall-clock strings for the
/// exported schedules.
pub fn minute_to_day_time(minute: i32, origin: NaiveDate) -> (String, String) {
    let dt: NaiveDateTime = origin.and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(minute as i64);
    (dt.format("%d/%m/%Y").to_string(), dt.format("%H:%M").to_string())
}

pub fn slot_of(minute: i32) -> i32 {
    minute / SLOT_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        // 2025-03-03 is a Monday.
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn event_minutes_count_from_origin_midnight() {
        let origin = monday();
        let t = parse_hm("09:30").unwrap();
        assert_eq!(event_minute(origin, t, origin), 9 * 60 + 30);
        let next_day = origin.succ_opt().unwrap();
        assert_eq!(event_minute(next_day, t, origin), MINUTES_PER_DAY + 9 * 60 + 30);
    }

    #[test]
    fn weekly_window_replays_on_second_week() {
        let origin = monday();
        let occ = weekly_window(
            2, // Tuesday
            parse_hm("13:00").unwrap(),
            parse_hm("13:30").unwrap(),
            origin,
            9,
        );
        assert_eq!(
            occ,
            vec![
                (MINUTES_PER_DAY + 13 * 60, MINUTES_PER_DAY + 13 * 60 + 30),
                (8 * MINUTES_PER_DAY + 13 * 60, 8 * MINUTES_PER_DAY + 13 * 60 + 30),
            ]
        );
    }

    #[test]
    fn weekly_window_before_origin_weekday_wraps_forward() {
        // Horizon starts on a Wednesday; a Monday window lands five days in.
        let wednesday = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let occ = weekly_minute(1, parse_hm("06:00").unwrap(), wednesday, 7);
        assert_eq!(occ, vec![5 * MINUTES_PER_DAY + 6 * 60]);
    }

    #[test]
    fn weekly_window_outside_horizon_is_dropped() {
        let origin = monday();
        let occ = weekly_minute(7, parse_hm("06:00").unwrap(), origin, 3);
        assert!(occ.is_empty());
    }

    #[test]
    fn minute_round_trip() {
        let origin = monday();
        let (day, time) = minute_to_day_time(MINUTES_PER_DAY + 7 * 60 + 45, origin);
        assert_eq!(day, "04/03/2025");
        assert_eq!(time, "07:45");
    }
}
