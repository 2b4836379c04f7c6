use std::collections::HashSet;

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::error::Result;
use crate::services::{SharedConfig, open_store};
use skillswap_core::ActivityLog;
use skillswap_store::UpdateSignal;

/// Totals across the whole activity log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub courses_completed: u32,
    pub hours_spent: f64,
    pub tokens_earned: i64,
    pub tokens_used: i64,
    pub active_days: usize,
    pub current_streak: u32,
}

#[derive(Clone)]
pub struct DashboardService {
    config: SharedConfig,
    signal: UpdateSignal,
}

impl DashboardService {
    pub(super) fn new(config: SharedConfig, signal: UpdateSignal) -> Self {
        Self { config, signal }
    }

    pub fn snapshot(&self) -> Result<DashboardSnapshot> {
        let store = open_store(&self.config, &self.signal)?;
        let log = store.load();
        Ok(summarize(&log, Local::now().date_naive()))
    }
}

fn summarize(log: &ActivityLog, today: NaiveDate) -> DashboardSnapshot {
    let mut snapshot = DashboardSnapshot::default();
    let mut days: HashSet<NaiveDate> = HashSet::new();

    for entry in &log.entries {
        snapshot.courses_completed += entry.courses_completed;
        snapshot.hours_spent += entry.time_spent;
        snapshot.tokens_earned += entry.tokens_earned;
        snapshot.tokens_used += entry.tokens_used;
        if let Ok(date) = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") {
            days.insert(date);
        }
    }

    snapshot.active_days = days.len();
    snapshot.current_streak = streak(&days, today);
    snapshot
}

/// Consecutive active days counting back from today. A day without
/// activity yet does not break a streak that ran through yesterday.
fn streak(days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut count = 0;
    while days.contains(&cursor) {
        count += 1;
        cursor = cursor - Duration::days(1);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_core::ActivityLogEntry;

    fn entry(date: &str, courses: u32, hours: f64, earned: i64, used: i64) -> ActivityLogEntry {
        ActivityLogEntry {
            date: date.to_string(),
            courses_completed: courses,
            time_spent: hours,
            tokens_earned: earned,
            tokens_used: used,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn totals_sum_every_entry() {
        let log = ActivityLog {
            entries: vec![
                entry("2026-08-28", 1, 1.5, 20, 0),
                entry("2026-08-29", 2, 3.0, 40, 10),
            ],
        };
        let snapshot = summarize(&log, date("2026-08-30"));
        assert_eq!(snapshot.courses_completed, 3);
        assert_eq!(snapshot.hours_spent, 4.5);
        assert_eq!(snapshot.tokens_earned, 60);
        assert_eq!(snapshot.tokens_used, 10);
        assert_eq!(snapshot.active_days, 2);
    }

    #[test]
    fn streak_counts_back_from_today() {
        let log = ActivityLog {
            entries: vec![
                entry("2026-08-28", 1, 1.0, 0, 0),
                entry("2026-08-29", 1, 1.0, 0, 0),
                entry("2026-08-30", 1, 1.0, 0, 0),
            ],
        };
        assert_eq!(summarize(&log, date("2026-08-30")).current_streak, 3);
    }

    #[test]
    fn quiet_today_does_not_break_a_running_streak() {
        let log = ActivityLog {
            entries: vec![
                entry("2026-08-28", 1, 1.0, 0, 0),
                entry("2026-08-29", 1, 1.0, 0, 0),
            ],
        };
        assert_eq!(summarize(&log, date("2026-08-30")).current_streak, 2);
    }

    #[test]
    fn gap_resets_the_streak() {
        let log = ActivityLog {
            entries: vec![
                entry("2026-08-25", 1, 1.0, 0, 0),
                entry("2026-08-30", 1, 1.0, 0, 0),
            ],
        };
        assert_eq!(summarize(&log, date("2026-08-30")).current_streak, 1);
    }

    #[test]
    fn empty_log_is_all_zeroes() {
        let snapshot = summarize(&ActivityLog::default(), date("2026-08-30"));
        assert_eq!(snapshot, DashboardSnapshot::default());
    }
}
