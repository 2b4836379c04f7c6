use chrono::Local;
use serde::{Deserialize, Serialize};

/// One day of learning activity, keyed by local calendar date (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub date: String,
    pub courses_completed: u32,
    pub time_spent: f64,
    pub tokens_earned: i64,
    pub tokens_used: i64,
}

impl ActivityLogEntry {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            courses_completed: 0,
            time_spent: 0.0,
            tokens_earned: 0,
            tokens_used: 0,
        }
    }
}

/// The full per-day activity log. At most one entry per date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub entries: Vec<ActivityLogEntry>,
}

impl ActivityLog {
    pub fn entry_for(&self, date: &str) -> Option<&ActivityLogEntry> {
        self.entries.iter().find(|entry| entry.date == date)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Authenticated user snapshot. `tokens` is the authoritative live balance;
/// the ledger only observes changes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub tokens: i64,
}

/// Server-pushed balance change. Replaces the untyped `{tokens?, delta?}`
/// payload so consumers never branch on optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceUpdate {
    Set { tokens: i64 },
    Delta { delta: i64 },
    SetWithDelta { tokens: i64, delta: i64 },
}

impl BalanceUpdate {
    pub fn tokens(&self) -> Option<i64> {
        match self {
            Self::Set { tokens } | Self::SetWithDelta { tokens, .. } => Some(*tokens),
            Self::Delta { .. } => None,
        }
    }

    pub fn delta(&self) -> Option<i64> {
        match self {
            Self::Delta { delta } | Self::SetWithDelta { delta, .. } => Some(*delta),
            Self::Set { .. } => None,
        }
    }

    /// Parse the wire shape. A frame carrying neither field is not a
    /// balance update and is rejected.
    pub fn from_wire(tokens: Option<i64>, delta: Option<i64>) -> Option<Self> {
        match (tokens, delta) {
            (Some(tokens), Some(delta)) => Some(Self::SetWithDelta { tokens, delta }),
            (Some(tokens), None) => Some(Self::Set { tokens }),
            (None, Some(delta)) => Some(Self::Delta { delta }),
            (None, None) => None,
        }
    }
}

/// Direction of a balance movement after splitting a signed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFlow {
    Earned(i64),
    Spent(i64),
    Unchanged,
}

/// Split a signed balance delta into the ledger's earned/used counters.
pub fn split_delta(delta: i64) -> TokenFlow {
    if delta > 0 {
        TokenFlow::Earned(delta)
    } else if delta < 0 {
        TokenFlow::Spent(-delta)
    } else {
        TokenFlow::Unchanged
    }
}

/// Today's log key in the local timezone.
pub fn today_key() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Find-or-create the entry for `date` and apply `mutate` to it.
///
/// Linear scan by date-key equality; safe only under the single-writer
/// assumption the log store runs with.
pub fn update_daily_entry(
    log: &mut ActivityLog,
    date: &str,
    mutate: impl FnOnce(&mut ActivityLogEntry),
) {
    if let Some(entry) = log.entries.iter_mut().find(|entry| entry.date == date) {
        mutate(entry);
        return;
    }
    let mut entry = ActivityLogEntry::empty(date);
    mutate(&mut entry);
    log.entries.push(entry);
}
