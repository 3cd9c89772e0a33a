//! Shared ledger service wrapper used by every front end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::csv::decode_records;
use crate::db::{
    Database, RecordQuery, RecordRepository, SqliteRecordRepository, SqliteSyncStateRepository,
    SyncStateRepository,
};
use crate::export::{render_records_export, ExportFormat};
use crate::models::{NewPurchase, Record, RecordUpdate, Sale, SyncRun, SyncSettings, SyncState};
use crate::stats::{compute_dashboard, Dashboard};
use crate::sync::{
    merge_records, GistClient, Reconciler, RemoteStore, SyncReport, SyncResult,
};
use crate::Result;

/// Counts from merging a CSV file into the local store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows decoded from the file
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Thread-safe service for ledger and sync operations.
///
/// The database lock is held for the whole of a sync cycle, so local edits
/// made while a cycle is in flight wait for it instead of being overwritten.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LedgerService {
    /// Open a ledger at the given filesystem path, creating parent directories.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened ledger at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory ledger (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Record a purchase.
    pub async fn buy(&self, purchase: NewPurchase) -> Result<Record> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).create(purchase)
    }

    /// Mark a vehicle as sold.
    pub async fn sell(&self, plate: &str, sale: &Sale) -> Result<Record> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).sell(plate, sale)
    }

    /// Edit an active record.
    pub async fn update(&self, plate: &str, update: &RecordUpdate) -> Result<Record> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).update(plate, update)
    }

    /// Fetch an active record by plate.
    pub async fn get(&self, plate: &str) -> Result<Option<Record>> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).get(plate)
    }

    /// List records matching a query.
    pub async fn list(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).list(query)
    }

    /// Every record including soft-deleted ones, ordered by plate.
    pub async fn list_all(&self) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).list_all()
    }

    /// Soft-delete a record.
    pub async fn delete(&self, plate: &str) -> Result<()> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).delete(plate)
    }

    /// Undo a soft delete.
    pub async fn restore(&self, plate: &str) -> Result<Record> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection()).restore(plate)
    }

    /// Permanently remove every local record. Sync history is kept.
    pub async fn wipe(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let removed = SqliteRecordRepository::new(db.connection()).wipe()?;
        tracing::warn!("Wiped {removed} local records");
        Ok(removed)
    }

    /// Dashboard figures over active records.
    pub async fn stats(&self, today: NaiveDate, window: usize) -> Result<Dashboard> {
        let records = {
            let db = self.db.lock().await;
            SqliteRecordRepository::new(db.connection()).list_active()?
        };
        Ok(compute_dashboard(&records, today, window))
    }

    /// Render active records for export.
    pub async fn export(&self, format: ExportFormat) -> Result<String> {
        let records = {
            let db = self.db.lock().await;
            SqliteRecordRepository::new(db.connection()).list_active()?
        };
        Ok(render_records_export(&records, format)?)
    }

    /// Merge a CSV snapshot into the local store with last-write-wins.
    pub async fn import_csv(&self, text: &str) -> Result<ImportReport> {
        let incoming = decode_records(text);
        let rows = incoming.len();

        let db = self.db.lock().await;
        let repo = SqliteRecordRepository::new(db.connection());
        let outcome = merge_records(repo.list_all()?, incoming);
        if !outcome.changed.is_empty() {
            repo.upsert_many(&outcome.changed)?;
        }

        tracing::info!(
            "Imported {rows} rows: {} inserted, {} updated",
            outcome.inserted,
            outcome.updated
        );
        Ok(ImportReport {
            rows,
            inserted: outcome.inserted,
            updated: outcome.updated,
        })
    }

    /// Run one sync cycle against an arbitrary remote.
    pub async fn sync_with<R: RemoteStore>(
        &self,
        settings: &SyncSettings,
        remote: &R,
    ) -> SyncResult<SyncReport> {
        let db = self.db.lock().await;
        let records = SqliteRecordRepository::new(db.connection());
        let state = SqliteSyncStateRepository::new(db.connection());
        Reconciler::new(&records, &state).run(settings, remote).await
    }

    /// Run one sync cycle against the configured gist.
    pub async fn sync(&self, settings: &SyncSettings) -> SyncResult<SyncReport> {
        let client = GistClient::from_settings(settings)?;
        self.sync_with(settings, &client).await
    }

    /// Version token and time of the last successful sync.
    pub async fn sync_state(&self) -> Result<SyncState> {
        let db = self.db.lock().await;
        SqliteSyncStateRepository::new(db.connection()).load()
    }

    /// Most recent sync cycles, newest first.
    pub async fn sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>> {
        let db = self.db.lock().await;
        SqliteSyncStateRepository::new(db.connection()).list_runs(limit)
    }
}
