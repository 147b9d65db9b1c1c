//! SQLite-backed snapshot store.
//!
//! # Responsibility
//! - Persist the `DayData` snapshot as JSON under one key of `kv_store`.
//!
//! # Invariants
//! - Saves are single-statement upserts, so a snapshot is never half written.
//! - Read paths reject undecodable snapshots instead of masking them.

use super::{ReminderStore, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use crate::model::day::DayData;
use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Key of the daily snapshot row.
pub const SNAPSHOT_KEY: &str = "chop-chop-data";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (and migrates) a store file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }
}

impl ReminderStore for SqliteStore {
    fn load(&self) -> StoreResult<Option<DayData>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [SNAPSHOT_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|json| {
                serde_json::from_str(&json).map_err(|err| {
                    error!(
                        "event=store_load module=store status=error error_code=snapshot_corrupt error={err}"
                    );
                    StoreError::Corrupt(err.to_string())
                })
            })
            .transpose()
    }

    fn save(&self, data: &DayData) -> StoreResult<()> {
        let json = serde_json::to_string(data)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![SNAPSHOT_KEY, json],
        )?;
        Ok(())
    }
}
