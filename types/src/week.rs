//! Calendar-week normalization. Weeks start on Monday 00:00 in the offset of the
//! timestamp being normalized.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

pub const DAYS_PER_WEEK: usize = 7;

/// Monday 00:00 of the week containing `now`. A Sunday belongs to the week that
/// started six days earlier.
pub fn week_start(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let offset = *now.offset();
    let local_midnight = week_start_date(now).and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc_midnight, offset)
}

pub fn week_start_millis(now: DateTime<FixedOffset>) -> i64 {
    week_start(now).timestamp_millis()
}

/// The local calendar Monday of the week containing `now`. Unlike the instant
/// from [`week_start`], this does not move when the UTC offset changes mid-week.
pub fn week_start_date(now: DateTime<FixedOffset>) -> NaiveDate {
    monday_of(now.date_naive())
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Recovers the local Monday from a stored week-start instant whose offset was
/// not recorded. Local Monday midnight falls between Sunday 10:00 and Monday
/// 12:00 UTC for every real offset, so shifting by +14h always lands on the
/// Monday or the Tuesday after it.
pub fn monday_from_millis(week_start_ms: i64) -> Option<NaiveDate> {
    let instant = DateTime::<Utc>::from_timestamp_millis(week_start_ms)?;
    Some(monday_of((instant + Duration::hours(14)).date_naive()))
}

/// Monday is 0, Sunday is 6.
pub fn day_index(now: DateTime<FixedOffset>) -> usize {
    now.weekday().num_days_from_monday() as usize
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Weekday};

    use super::*;

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_midweek_normalizes_to_monday_midnight() {
        // Thursday 2024-03-07
        let start = week_start(at(0, 2024, 3, 7, 15, 45));
        assert_eq!(start, at(0, 2024, 3, 4, 0, 0));
        assert_eq!(start.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_sunday_belongs_to_preceding_monday() {
        let start = week_start(at(0, 2024, 3, 10, 23, 59));
        assert_eq!(start, at(0, 2024, 3, 4, 0, 0));
        assert_eq!(day_index(at(0, 2024, 3, 10, 23, 59)), 6);
    }

    #[test]
    fn test_monday_midnight_is_its_own_week_start() {
        let monday = at(0, 2024, 3, 11, 0, 0);
        assert_eq!(week_start(monday), monday);
        assert_eq!(day_index(monday), 0);
    }

    #[test]
    fn test_week_start_uses_local_offset() {
        // 2024-03-11 01:00 at UTC+2 is still Sunday in UTC
        let local = at(2, 2024, 3, 11, 1, 0);
        assert_eq!(week_start(local), at(2, 2024, 3, 11, 0, 0));
        assert_eq!(day_index(local), 0);
        assert_eq!(
            week_start_millis(local),
            at(2, 2024, 3, 11, 0, 0).timestamp_millis()
        );
    }

    #[test]
    fn test_monday_date_is_stable_across_offset_change() {
        // DST starts in central Europe on Sunday 2024-03-31
        let monday = at(1, 2024, 3, 25, 9, 0);
        let sunday = at(2, 2024, 3, 31, 10, 0);
        assert_ne!(week_start_millis(monday), week_start_millis(sunday));
        assert_eq!(week_start_date(monday), week_start_date(sunday));
        assert_eq!(
            week_start_date(sunday),
            NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()
        );
    }

    #[test]
    fn test_monday_recovered_from_stored_instant_for_any_offset() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        for offset_hours in -12..=14 {
            let start = week_start(at(offset_hours, 2024, 3, 13, 12, 0));
            assert_eq!(
                monday_from_millis(start.timestamp_millis()),
                Some(expected),
                "offset {offset_hours}"
            );
        }
    }

    #[test]
    fn test_week_start_across_month_and_year() {
        // Wednesday 2025-01-01
        assert_eq!(
            week_start(at(-5, 2025, 1, 1, 8, 0)),
            at(-5, 2024, 12, 30, 0, 0)
        );
    }
}
