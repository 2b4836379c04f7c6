use chrono::{Duration, Local, NaiveDate};

use crate::error::Result;
use crate::services::{SharedConfig, open_store};
use skillswap_core::{ActivityLog, ActivityLogEntry};
use skillswap_store::UpdateSignal;

#[derive(Clone)]
pub struct ProgressService {
    config: SharedConfig,
    signal: UpdateSignal,
}

impl ProgressService {
    pub(super) fn new(config: SharedConfig, signal: UpdateSignal) -> Self {
        Self { config, signal }
    }

    /// Per-day points for the trailing `days` window ending today,
    /// zero-filled for days without activity, newest last.
    pub fn daily_series(&self, days: u32) -> Result<Vec<ActivityLogEntry>> {
        let store = open_store(&self.config, &self.signal)?;
        let log = store.load();
        Ok(series(&log, Local::now().date_naive(), days))
    }
}

fn series(log: &ActivityLog, today: NaiveDate, days: u32) -> Vec<ActivityLogEntry> {
    (0..days)
        .rev()
        .map(|back| {
            let date = (today - Duration::days(back as i64))
                .format("%Y-%m-%d")
                .to_string();
            log.entry_for(&date)
                .cloned()
                .unwrap_or_else(|| ActivityLogEntry::empty(date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_zero_filled_and_newest_last() {
        let mut log = ActivityLog::default();
        log.entries.push(ActivityLogEntry {
            date: "2026-08-29".to_string(),
            courses_completed: 2,
            time_spent: 3.0,
            tokens_earned: 40,
            tokens_used: 5,
        });

        let today = NaiveDate::parse_from_str("2026-08-30", "%Y-%m-%d").unwrap();
        let points = series(&log, today, 3);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, "2026-08-28");
        assert_eq!(points[0].courses_completed, 0);
        assert_eq!(points[1].date, "2026-08-29");
        assert_eq!(points[1].courses_completed, 2);
        assert_eq!(points[2].date, "2026-08-30");
        assert_eq!(points[2].time_spent, 0.0);
    }

    #[test]
    fn empty_window_when_zero_days_requested() {
        let today = NaiveDate::parse_from_str("2026-08-30", "%Y-%m-%d").unwrap();
        assert!(series(&ActivityLog::default(), today, 0).is_empty());
    }
}
