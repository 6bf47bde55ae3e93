use std::fmt::Display;

use chrono::{DateTime, FixedOffset, NaiveDate, Weekday};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::week::{day_index, monday_from_millis, week_start_date, week_start_millis, DAYS_PER_WEEK};

/// Minutes of learning per day for the current week only. Nothing older is kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredWeeklyStats")]
pub struct WeeklyStats {
    /// Epoch milliseconds of Monday 00:00 local time, as it was when the week began.
    pub week_start_timestamp: i64,
    /// The local Monday. Week identity is decided by this date, never by the instant.
    pub week_start_date: NaiveDate,
    /// Index 0 is Monday, 6 is Sunday.
    pub daily_minutes: [u32; DAYS_PER_WEEK],
}

/// Weeks written before the Monday date was stored only carry the instant.
#[derive(Deserialize)]
struct StoredWeeklyStats {
    week_start_timestamp: i64,
    #[serde(default)]
    week_start_date: Option<NaiveDate>,
    daily_minutes: [u32; DAYS_PER_WEEK],
}

impl TryFrom<StoredWeeklyStats> for WeeklyStats {
    type Error = String;

    fn try_from(stored: StoredWeeklyStats) -> Result<Self, Self::Error> {
        match stored.week_start_date {
            Some(week_start_date) => Ok(Self {
                week_start_timestamp: stored.week_start_timestamp,
                week_start_date,
                daily_minutes: stored.daily_minutes,
            }),
            None => Self::from_week_start_millis(stored.week_start_timestamp, stored.daily_minutes),
        }
    }
}

/// Lifetime counters for one game type. They only ever go up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_pairs_matched: u32,
    pub games_played: u32,
}

impl WeeklyStats {
    pub fn empty_week(now: DateTime<FixedOffset>) -> Self {
        Self {
            week_start_timestamp: week_start_millis(now),
            week_start_date: week_start_date(now),
            daily_minutes: [0; DAYS_PER_WEEK],
        }
    }

    /// Rebuilds a week from its start instant alone, recovering the Monday date.
    pub fn from_week_start_millis(
        week_start_timestamp: i64,
        daily_minutes: [u32; DAYS_PER_WEEK],
    ) -> Result<Self, String> {
        let week_start_date = monday_from_millis(week_start_timestamp)
            .ok_or_else(|| format!("Week start out of range: {week_start_timestamp}"))?;
        Ok(Self {
            week_start_timestamp,
            week_start_date,
            daily_minutes,
        })
    }

    /// True while `now` falls on or after this week's Monday and before the next.
    /// Compared by local date so a DST change inside the week is not a new week.
    pub fn is_current(&self, now: DateTime<FixedOffset>) -> bool {
        self.week_start_date == week_start_date(now)
    }

    /// Adds `minutes` to today's bucket, first discarding the stored week if `now`
    /// falls in a different one. Returns whether a reset happened.
    pub fn add_minutes(&mut self, now: DateTime<FixedOffset>, minutes: u32) -> bool {
        let rolled_over = !self.is_current(now);
        if rolled_over {
            *self = Self::empty_week(now);
        }
        let day = day_index(now);
        self.daily_minutes[day] = self.daily_minutes[day].saturating_add(minutes);
        rolled_over
    }

    pub fn total_minutes(&self) -> u32 {
        self.daily_minutes.iter().sum()
    }

    pub fn minutes_on(&self, weekday: Weekday) -> u32 {
        self.daily_minutes[weekday.num_days_from_monday() as usize]
    }
}

impl OverallStats {
    pub fn add_pairs_matched(&mut self, pairs: u32) {
        self.total_pairs_matched = self.total_pairs_matched.saturating_add(pairs);
    }

    pub fn increment_games_played(&mut self) {
        self.games_played = self.games_played.saturating_add(1);
    }
}

impl Display for WeeklyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
            .iter()
            .zip(self.daily_minutes.iter())
            .map(|(day, minutes)| format!("{day} {minutes}m"))
            .join(", ");
        write!(f, "{days} (total {}m)", self.total_minutes())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_minutes_land_in_todays_bucket() {
        // Wednesday
        let now = utc(2024, 3, 6, 10);
        let mut stats = WeeklyStats::empty_week(now);
        assert!(!stats.add_minutes(now, 15));
        assert!(!stats.add_minutes(now + Duration::hours(2), 5));
        assert_eq!(stats.daily_minutes, [0, 0, 20, 0, 0, 0, 0]);
        assert_eq!(stats.minutes_on(Weekday::Wed), 20);
        assert_eq!(stats.total_minutes(), 20);
    }

    #[test]
    fn test_new_week_discards_previous_minutes() {
        let monday = utc(2024, 3, 4, 9);
        let mut stats = WeeklyStats::empty_week(monday);
        stats.add_minutes(monday, 10);
        assert_eq!(stats.daily_minutes, [10, 0, 0, 0, 0, 0, 0]);

        let next_tuesday = utc(2024, 3, 12, 9);
        assert!(stats.add_minutes(next_tuesday, 7));
        assert_eq!(stats.daily_minutes, [0, 7, 0, 0, 0, 0, 0]);
        assert!(stats.is_current(next_tuesday));
        assert!(!stats.is_current(monday));
    }

    #[test]
    fn test_sunday_minutes_stay_in_the_same_week() {
        let monday = utc(2024, 3, 4, 9);
        let sunday = utc(2024, 3, 10, 20);
        let mut stats = WeeklyStats::empty_week(monday);
        stats.add_minutes(monday, 3);
        assert!(!stats.add_minutes(sunday, 4));
        assert_eq!(stats.daily_minutes, [3, 0, 0, 0, 0, 0, 4]);
    }

    fn local(offset_hours: i32, y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_spring_forward_keeps_the_week() {
        let monday = local(1, 2024, 3, 25, 9);
        let sunday = local(2, 2024, 3, 31, 10);
        let mut stats = WeeklyStats::empty_week(monday);
        stats.add_minutes(monday, 30);
        assert!(stats.is_current(sunday));
        assert!(!stats.add_minutes(sunday, 5));
        assert_eq!(stats.daily_minutes, [30, 0, 0, 0, 0, 0, 5]);
    }

    #[test]
    fn test_fall_back_keeps_the_week() {
        let monday = local(2, 2024, 10, 21, 9);
        let sunday = local(1, 2024, 10, 27, 18);
        let mut stats = WeeklyStats::empty_week(monday);
        stats.add_minutes(monday, 12);
        assert!(!stats.add_minutes(sunday, 8));
        assert_eq!(stats.daily_minutes, [12, 0, 0, 0, 0, 0, 8]);

        let next_monday = local(1, 2024, 10, 28, 8);
        assert!(stats.add_minutes(next_monday, 1));
        assert_eq!(stats.daily_minutes, [1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_stored_week_without_date_recovers_monday() {
        let monday = local(-7, 2024, 3, 4, 0);
        let json = format!(
            r#"{{"week_start_timestamp": {}, "daily_minutes": [4, 0, 0, 0, 0, 0, 0]}}"#,
            monday.timestamp_millis()
        );
        let stats: WeeklyStats = serde_json::from_str(&json).unwrap();
        assert_eq!(
            stats.week_start_date,
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert!(stats.is_current(local(-7, 2024, 3, 10, 23)));
    }

    #[test]
    fn test_overall_stats_only_increase() {
        let mut stats = OverallStats::default();
        stats.add_pairs_matched(8);
        stats.increment_games_played();
        stats.add_pairs_matched(u32::MAX);
        assert_eq!(stats.total_pairs_matched, u32::MAX);
        assert_eq!(stats.games_played, 1);
    }
}
