mod activity;
mod signal;

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

pub use activity::{ACTIVITY_LOG_KEY, ActivityLogStore};
pub use signal::{Signal, UpdateSignal};

pub const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");

pub const MIGRATIONS: &[(&str, &str)] = &[("0001_init", MIGRATION_0001)];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// String-keyed blob store with write-whole/read-whole semantics per key.
///
/// This is the local persistence layer for the sync core; every value is a
/// single serialized payload, rewritten wholesale on mutation.
pub struct Kv {
    conn: Connection,
}

impl Kv {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        let kv = Self { conn };
        kv.migrate()?;
        Ok(kv)
    }

    fn migrate(&self) -> Result<()> {
        for (_name, sql) in MIGRATIONS {
            self.conn.execute_batch(sql)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv_blob WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO kv_blob (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
              value = excluded.value,
              updated_at = excluded.updated_at
            "#,
            params![key, value, now],
        )?;
        Ok(())
    }
}
