//! Sync state repository implementation

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite stores counts as i64

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{SyncRun, SyncState};

const KEY_LAST_VERSION: &str = "sync.last_version";
const KEY_LAST_SYNCED_AT: &str = "sync.last_synced_at";

/// Trait for sync bookkeeping storage
pub trait SyncStateRepository {
    /// Load the last-seen version token and sync time
    fn load(&self) -> Result<SyncState>;

    /// Save the last-seen version token and sync time
    fn save(&self, state: &SyncState) -> Result<()>;

    /// Append a completed cycle to the history
    fn record_run(&self, run: &SyncRun) -> Result<SyncRun>;

    /// Most recent cycles, newest first
    fn list_runs(&self, limit: usize) -> Result<Vec<SyncRun>>;
}

/// `SQLite` implementation of `SyncStateRepository`
pub struct SqliteSyncStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: Option<&str>) -> Result<()> {
        if let Some(value) = value {
            self.conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )?;
        } else {
            self.conn
                .execute("DELETE FROM settings WHERE key = ?", [key])?;
        }
        Ok(())
    }

    fn parse_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncRun> {
        Ok(SyncRun {
            id: row.get(0)?,
            synced_at: row.get(1)?,
            version: row.get(2)?,
            pushed: row.get::<_, i32>(3)? != 0,
            inserted: row.get::<_, i64>(4)? as usize,
            updated: row.get::<_, i64>(5)? as usize,
            total: row.get::<_, i64>(6)? as usize,
        })
    }
}

impl SyncStateRepository for SqliteSyncStateRepository<'_> {
    fn load(&self) -> Result<SyncState> {
        Ok(SyncState {
            last_version: self.get_setting(KEY_LAST_VERSION)?,
            last_synced_at: self
                .get_setting(KEY_LAST_SYNCED_AT)?
                .and_then(|value| value.parse().ok()),
        })
    }

    fn save(&self, state: &SyncState) -> Result<()> {
        self.set_setting(KEY_LAST_VERSION, state.last_version.as_deref())?;
        self.set_setting(
            KEY_LAST_SYNCED_AT,
            state.last_synced_at.map(|at| at.to_string()).as_deref(),
        )?;
        Ok(())
    }

    fn record_run(&self, run: &SyncRun) -> Result<SyncRun> {
        self.conn.execute(
            "INSERT INTO sync_runs (synced_at, version, pushed, inserted, updated, total)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                run.synced_at,
                run.version,
                i32::from(run.pushed),
                run.inserted as i64,
                run.updated as i64,
                run.total as i64,
            ],
        )?;
        Ok(SyncRun {
            id: self.conn.last_insert_rowid(),
            ..run.clone()
        })
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<SyncRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, synced_at, version, pushed, inserted, updated, total
             FROM sync_runs
             ORDER BY synced_at DESC, id DESC
             LIMIT ?",
        )?;
        let runs = stmt
            .query_map([limit as i64], Self::parse_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }
}
