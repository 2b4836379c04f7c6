use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Kv, Result, Signal, UpdateSignal};
use skillswap_core::{ActivityLog, ActivityLogEntry, today_key, update_daily_entry};

pub const ACTIVITY_LOG_KEY: &str = "activity_log";

const ACTIVITY_LOG_VERSION: u32 = 1;

/// Serialized shape of the persisted log. The version tag exists so future
/// field additions can be told apart from corruption.
#[derive(Debug, Serialize, Deserialize)]
struct ActivityLogBlob {
    version: u32,
    entries: Vec<ActivityLogEntry>,
}

/// Durable per-day accumulation of learning-activity counters; the single
/// source of truth the dashboard and progress consumers read from.
///
/// Every mutation is a read-modify-write of the whole log under one key.
/// A successful save broadcasts [`Signal::ActivityLog`] so consumers can
/// re-read without sharing in-memory state.
pub struct ActivityLogStore {
    kv: Kv,
    signal: UpdateSignal,
}

impl ActivityLogStore {
    pub fn open(path: impl AsRef<Path>, signal: UpdateSignal) -> Result<Self> {
        Ok(Self {
            kv: Kv::open(path)?,
            signal,
        })
    }

    /// Read the current log. A missing key, unreadable blob, or unknown
    /// version degrades to an empty log; load never fails the caller.
    pub fn load(&self) -> ActivityLog {
        let raw = match self.kv.get(ACTIVITY_LOG_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ActivityLog::default(),
            Err(err) => {
                warn!("failed to read activity log: {err}");
                return ActivityLog::default();
            }
        };
        match serde_json::from_str::<ActivityLogBlob>(&raw) {
            Ok(blob) if blob.version == ACTIVITY_LOG_VERSION => ActivityLog {
                entries: blob.entries,
            },
            Ok(blob) => {
                warn!(
                    "activity log blob has unknown version {}; starting empty",
                    blob.version
                );
                ActivityLog::default()
            }
            Err(err) => {
                warn!("failed to parse activity log: {err}");
                ActivityLog::default()
            }
        }
    }

    /// Persist the whole log and broadcast the update signal.
    ///
    /// Persistence failures surface to the caller; they are not retried.
    pub fn save(&self, log: &ActivityLog) -> Result<()> {
        let blob = ActivityLogBlob {
            version: ACTIVITY_LOG_VERSION,
            entries: log.entries.clone(),
        };
        let raw = serde_json::to_string(&blob)?;
        self.kv.put(ACTIVITY_LOG_KEY, &raw)?;
        self.signal.notify(Signal::ActivityLog);
        Ok(())
    }

    pub fn record_course_completion(
        &self,
        time_spent_hours: f64,
        tokens_earned: i64,
    ) -> Result<ActivityLog> {
        let mut log = self.load();
        update_daily_entry(&mut log, &today_key(), |entry| {
            entry.courses_completed += 1;
            entry.time_spent += time_spent_hours;
            entry.tokens_earned += tokens_earned;
        });
        self.save(&log)?;
        Ok(log)
    }

    /// Accumulate spent tokens into today's entry. A zero or negative
    /// amount is a no-op returning the unchanged log, so spurious
    /// zero-delta observations never touch the store.
    pub fn record_token_usage(&self, tokens_used: i64) -> Result<ActivityLog> {
        if tokens_used <= 0 {
            return Ok(self.load());
        }
        let mut log = self.load();
        update_daily_entry(&mut log, &today_key(), |entry| {
            entry.tokens_used += tokens_used;
        });
        self.save(&log)?;
        Ok(log)
    }

    pub fn record_token_earned(&self, tokens_earned: i64) -> Result<ActivityLog> {
        if tokens_earned <= 0 {
            return Ok(self.load());
        }
        let mut log = self.load();
        update_daily_entry(&mut log, &today_key(), |entry| {
            entry.tokens_earned += tokens_earned;
        });
        self.save(&log)?;
        Ok(log)
    }

    pub fn signal(&self) -> &UpdateSignal {
        &self.signal
    }
}
