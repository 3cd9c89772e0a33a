//! Pull, merge, push, commit.

use serde::Serialize;

use super::{merge_records, RemoteSnapshot, RemoteStore, SyncError, SyncResult};
use crate::csv::{decode_records, encode_records};
use crate::db::{RecordRepository, SyncStateRepository};
use crate::models::{SyncRun, SyncSettings, SyncState};
use crate::util::unix_millis_now;

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Whether a new snapshot was uploaded
    pub pushed: bool,
    /// Remote revision after the cycle
    pub version: Option<String>,
    /// Remote-only records added locally
    pub inserted: usize,
    /// Local records replaced by newer remote ones
    pub updated: usize,
    /// Records in the merged set
    pub total: usize,
    /// Completion time (Unix ms)
    pub synced_at: i64,
}

/// Runs one reconcile cycle against a local store.
///
/// Reads the local records once, writes them once at the end. Merged
/// records, sync state and the history row commit together, so nothing local
/// changes unless the whole cycle succeeds.
///
/// The compare-and-swap token for the push is the revision fetched in the
/// same cycle.
pub struct Reconciler<'a, S, T> {
    records: &'a S,
    state: &'a T,
}

impl<'a, S, T> Reconciler<'a, S, T>
where
    S: RecordRepository,
    T: SyncStateRepository,
{
    pub const fn new(records: &'a S, state: &'a T) -> Self {
        Self { records, state }
    }

    pub async fn run<R: RemoteStore>(
        &self,
        settings: &SyncSettings,
        remote: &R,
    ) -> SyncResult<SyncReport> {
        if settings.gist_id().is_none() {
            return Err(SyncError::NotConfigured("no gist id set".to_string()));
        }
        if settings.token().is_none() {
            return Err(SyncError::NotConfigured("no access token set".to_string()));
        }

        let snapshot = match remote.fetch().await {
            Ok(snapshot) => snapshot,
            Err(SyncError::MalformedRemoteContent { version, reason }) => {
                tracing::warn!("Ignoring unreadable remote snapshot: {reason}");
                Some(RemoteSnapshot {
                    content: String::new(),
                    version,
                })
            }
            Err(error) => return Err(error),
        };

        let fetched_version = snapshot.as_ref().and_then(|s| s.version.clone());
        let remote_records = snapshot
            .as_ref()
            .map(|snapshot| decode_records(&snapshot.content))
            .unwrap_or_default();
        let local_records = self.records.list_all()?;
        let outcome = merge_records(local_records, remote_records);
        let encoded = encode_records(&outcome.records);

        let needs_push = !matches!(&snapshot, Some(s) if s.content == encoded);
        let version = if needs_push {
            tracing::debug!(
                "Pushing merged snapshot of {} records",
                outcome.records.len()
            );
            Some(remote.push(&encoded, fetched_version.as_deref()).await?)
        } else {
            tracing::debug!("Remote snapshot already up to date");
            fetched_version
        };

        let report = SyncReport {
            pushed: needs_push,
            version,
            inserted: outcome.inserted,
            updated: outcome.updated,
            total: outcome.records.len(),
            synced_at: unix_millis_now(),
        };
        self.records.atomically(|| {
            if !outcome.changed.is_empty() {
                self.records.upsert_many(&outcome.changed)?;
            }
            self.state.save(&SyncState {
                last_version: report.version.clone(),
                last_synced_at: Some(report.synced_at),
            })?;
            self.state.record_run(&SyncRun {
                id: 0,
                synced_at: report.synced_at,
                version: report.version.clone(),
                pushed: report.pushed,
                inserted: report.inserted,
                updated: report.updated,
                total: report.total,
            })
        })?;

        tracing::info!(
            "Sync completed: {} records, {} inserted, {} updated, pushed={}",
            report.total,
            report.inserted,
            report.updated,
            report.pushed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use crate::db::{
        Database, RecordRepository, SqliteRecordRepository, SqliteSyncStateRepository,
    };
    use crate::error::{Error, Result};
    use crate::models::{NewPurchase, Record};

    /// `SQLite` sync state whose writes fail on demand.
    struct FlakyState<'a> {
        inner: SqliteSyncStateRepository<'a>,
        fail_save: bool,
        fail_record_run: bool,
    }

    impl SyncStateRepository for FlakyState<'_> {
        fn load(&self) -> Result<SyncState> {
            self.inner.load()
        }

        fn save(&self, state: &SyncState) -> Result<()> {
            if self.fail_save {
                return Err(Error::Database("disk full".to_string()));
            }
            self.inner.save(state)
        }

        fn record_run(&self, run: &SyncRun) -> Result<SyncRun> {
            if self.fail_record_run {
                return Err(Error::Database("disk full".to_string()));
            }
            self.inner.record_run(run)
        }

        fn list_runs(&self, limit: usize) -> Result<Vec<SyncRun>> {
            self.inner.list_runs(limit)
        }
    }

    /// In-memory remote with a revision counter.
    #[derive(Default)]
    struct MemoryRemote {
        snapshot: RefCell<Option<RemoteSnapshot>>,
        revision: Cell<u32>,
        pushes: Cell<u32>,
        fetch_error: RefCell<Option<SyncError>>,
        /// Simulates another client writing between our fetch and push
        concurrent_write: Cell<bool>,
    }

    impl MemoryRemote {
        fn with_content(content: &str) -> Self {
            let remote = Self::default();
            remote.snapshot.replace(Some(RemoteSnapshot {
                content: content.to_string(),
                version: Some("r0".to_string()),
            }));
            remote
        }

        fn content(&self) -> Option<String> {
            self.snapshot.borrow().as_ref().map(|s| s.content.clone())
        }

        fn bump(&self) -> String {
            self.revision.set(self.revision.get() + 1);
            format!("r{}", self.revision.get())
        }
    }

    impl RemoteStore for MemoryRemote {
        async fn fetch(&self) -> SyncResult<Option<RemoteSnapshot>> {
            if let Some(error) = self.fetch_error.borrow_mut().take() {
                return Err(error);
            }
            Ok(self.snapshot.borrow().clone())
        }

        async fn push(&self, content: &str, expected_version: Option<&str>) -> SyncResult<String> {
            if self.concurrent_write.get() {
                let version = self.bump();
                self.snapshot.replace(Some(RemoteSnapshot {
                    content: "\"plate\"".to_string(),
                    version: Some(version),
                }));
            }

            let current = self.snapshot.borrow().as_ref().and_then(|s| s.version.clone());
            if current.as_deref() != expected_version {
                return Err(SyncError::Conflict {
                    expected: expected_version.map(str::to_string),
                    actual: current,
                });
            }

            let version = self.bump();
            self.snapshot.replace(Some(RemoteSnapshot {
                content: content.to_string(),
                version: Some(version.clone()),
            }));
            self.pushes.set(self.pushes.get() + 1);
            Ok(version)
        }
    }

    fn settings() -> SyncSettings {
        SyncSettings::new("gist123", "ghp_test")
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn local_record() -> Record {
        Record {
            plate: "GJ1".to_string(),
            owner: "Ravi".to_string(),
            purchase_price: 10_000.0,
            repair_cost: 500.0,
            selling_price: 0.0,
            date_purchase: Some(date("2023-12-20")),
            date_selling: None,
            updated_at: crate::models::parse_timestamp("2024-01-01"),
            deleted: false,
        }
    }

    const REMOTE_GJ1_SOLD: &str = "plate,owner,purchasePrice,repairCost,sellingPrice,netProfit,\
datePurchase,dateSelling,updatedAt,deleted\r\n\
GJ1,Ravi,10000,500,12000,0,2023-12-20,2024-02-01,2024-02-01,false\r\n";

    async fn reconcile(db: &Database, remote: &MemoryRemote) -> SyncResult<SyncReport> {
        let records = SqliteRecordRepository::new(db.connection());
        let state = SqliteSyncStateRepository::new(db.connection());
        Reconciler::new(&records, &state).run(&settings(), remote).await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_newer_remote_sale_wins() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.upsert_many(&[local_record()]).unwrap();

        let remote = MemoryRemote::with_content(REMOTE_GJ1_SOLD);
        let report = reconcile(&db, &remote).await.unwrap();

        let merged = repo.get("GJ1").unwrap().unwrap();
        assert_eq!(merged.selling_price, 12_000.0);
        assert_eq!(merged.net_profit(), 1_500.0);
        assert_eq!(merged.date_selling, Some(date("2024-02-01")));
        assert_eq!(report.updated, 1);
        assert_eq!(report.inserted, 0);
        // Remote text used a bare date, so the canonical encoding differs once
        assert!(report.pushed);
        assert_eq!(report.version.as_deref(), Some("r1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_cycle_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(NewPurchase {
            plate: "AA1".to_string(),
            purchase_price: 1_000.0,
            ..NewPurchase::default()
        })
        .unwrap();

        let remote = MemoryRemote::with_content(REMOTE_GJ1_SOLD);
        let first = reconcile(&db, &remote).await.unwrap();
        assert!(first.pushed);
        let after_first = repo.list_all().unwrap();
        let content_after_first = remote.content();

        let second = reconcile(&db, &remote).await.unwrap();
        assert!(!second.pushed);
        assert_eq!(remote.pushes.get(), 1);
        assert_eq!(second.version, first.version);
        assert_eq!(repo.list_all().unwrap(), after_first);
        assert_eq!(remote.content(), content_after_first);
        assert_eq!(second.inserted + second.updated, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_remote_pushes_local_set() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.upsert_many(&[local_record()]).unwrap();

        let remote = MemoryRemote::default();
        let report = reconcile(&db, &remote).await.unwrap();

        assert!(report.pushed);
        assert_eq!(report.total, 1);
        let pushed = decode_records(&remote.content().unwrap());
        assert_eq!(pushed, vec![local_record()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_local_and_remote_pushes_header() {
        let db = Database::open_in_memory().unwrap();
        let remote = MemoryRemote::default();

        let report = reconcile(&db, &remote).await.unwrap();
        assert!(report.pushed);
        assert_eq!(report.total, 0);
        assert_eq!(remote.content(), Some(encode_records(&[])));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_only_records_are_inserted_locally() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());

        let remote = MemoryRemote::with_content("plate,owner,updatedAt\nKA05,Asha,garbage\n");
        let report = reconcile(&db, &remote).await.unwrap();

        assert_eq!(report.inserted, 1);
        let inserted = repo.get("KA05").unwrap().unwrap();
        assert_eq!(inserted.owner, "Asha");
        assert_eq!(inserted.updated_at, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unparseable_remote_timestamp_never_overrides() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.upsert_many(&[local_record()]).unwrap();

        let remote =
            MemoryRemote::with_content("plate,sellingPrice,updatedAt\nGJ1,99999,not-a-date\n");
        reconcile(&db, &remote).await.unwrap();

        assert_eq!(repo.get("GJ1").unwrap().unwrap(), local_record());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_conflict_leaves_local_untouched() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        let state = SqliteSyncStateRepository::new(db.connection());
        repo.upsert_many(&[local_record()]).unwrap();

        let remote = MemoryRemote::with_content(REMOTE_GJ1_SOLD);
        remote.concurrent_write.set(true);

        let result = reconcile(&db, &remote).await;
        assert!(matches!(result, Err(SyncError::Conflict { .. })));
        assert_eq!(repo.list_all().unwrap(), vec![local_record()]);
        assert_eq!(state.load().unwrap(), SyncState::default());
        assert!(state.list_runs(10).unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_state_write_rolls_back_merged_records() {
        for (fail_save, fail_record_run) in [(true, false), (false, true)] {
            let db = Database::open_in_memory().unwrap();
            let repo = SqliteRecordRepository::new(db.connection());
            let state = FlakyState {
                inner: SqliteSyncStateRepository::new(db.connection()),
                fail_save,
                fail_record_run,
            };
            repo.upsert_many(&[local_record()]).unwrap();

            let remote = MemoryRemote::with_content(
                "plate,owner,updatedAt\nKA05,Asha,2024-03-01T00:00:00.000Z\n",
            );
            let result = Reconciler::new(&repo, &state).run(&settings(), &remote).await;

            assert!(matches!(result, Err(SyncError::Local(_))));
            assert_eq!(repo.list_all().unwrap(), vec![local_record()]);
            assert_eq!(state.load().unwrap(), SyncState::default());
            assert!(state.list_runs(10).unwrap().is_empty());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_not_configured_fails_before_fetch() {
        let db = Database::open_in_memory().unwrap();
        let records = SqliteRecordRepository::new(db.connection());
        let state = SqliteSyncStateRepository::new(db.connection());
        let remote = MemoryRemote::default();
        remote
            .fetch_error
            .replace(Some(SyncError::Unknown("fetch must not run".to_string())));

        let reconciler = Reconciler::new(&records, &state);
        let no_token = SyncSettings {
            token: None,
            ..settings()
        };
        let result = reconciler.run(&no_token, &remote).await;
        assert!(matches!(result, Err(SyncError::NotConfigured(_))));

        let no_gist = SyncSettings {
            gist_id: None,
            ..settings()
        };
        let result = reconciler.run(&no_gist, &remote).await;
        assert!(matches!(result, Err(SyncError::NotConfigured(_))));
        assert!(remote.fetch_error.borrow().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_network_and_auth_errors_abort_without_local_changes() {
        for error in [
            SyncError::NetworkUnavailable("offline".to_string()),
            SyncError::AuthInvalid("Bad credentials (401)".to_string()),
        ] {
            let db = Database::open_in_memory().unwrap();
            let repo = SqliteRecordRepository::new(db.connection());
            let state = SqliteSyncStateRepository::new(db.connection());
            repo.upsert_many(&[local_record()]).unwrap();

            let remote = MemoryRemote::with_content(REMOTE_GJ1_SOLD);
            remote.fetch_error.replace(Some(error));

            assert!(reconcile(&db, &remote).await.is_err());
            assert_eq!(repo.list_all().unwrap(), vec![local_record()]);
            assert_eq!(state.load().unwrap(), SyncState::default());
            assert_eq!(remote.pushes.get(), 0);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_remote_degrades_to_empty() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.upsert_many(&[local_record()]).unwrap();

        let remote = MemoryRemote::with_content("ignored");
        remote
            .fetch_error
            .replace(Some(SyncError::MalformedRemoteContent {
                version: Some("r0".to_string()),
                reason: "gist has no file named lotbook.csv".to_string(),
            }));

        let report = reconcile(&db, &remote).await.unwrap();
        assert!(report.pushed);
        assert_eq!(decode_records(&remote.content().unwrap()), vec![local_record()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_successful_cycle_records_state_and_history() {
        let db = Database::open_in_memory().unwrap();
        let state = SqliteSyncStateRepository::new(db.connection());
        let remote = MemoryRemote::with_content(REMOTE_GJ1_SOLD);

        let report = reconcile(&db, &remote).await.unwrap();

        let saved = state.load().unwrap();
        assert_eq!(saved.last_version, report.version);
        assert_eq!(saved.last_synced_at, Some(report.synced_at));

        let runs = state.list_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].inserted, 1);
        assert!(runs[0].pushed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_soft_deletes_propagate_to_remote() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(NewPurchase {
            plate: "AA1".to_string(),
            ..NewPurchase::default()
        })
        .unwrap();

        let remote = MemoryRemote::default();
        reconcile(&db, &remote).await.unwrap();
        repo.delete("AA1").unwrap();
        reconcile(&db, &remote).await.unwrap();

        let pushed = decode_records(&remote.content().unwrap());
        assert_eq!(pushed.len(), 1);
        assert!(pushed[0].deleted);
    }
}
