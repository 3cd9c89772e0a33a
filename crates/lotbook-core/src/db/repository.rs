//! Record repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    next_update_timestamp, normalize_plate, parse_date, NewPurchase, Record, RecordUpdate, Sale,
};
use crate::util::unix_millis_now;

const SELECT_COLUMNS: &str = "SELECT plate, owner, purchase_price, repair_cost, selling_price,
        date_purchase, date_selling, updated_at, is_deleted
     FROM records";

/// Which records a listing includes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Every active record
    #[default]
    All,
    /// Active records with a selling date
    Sold,
    /// Active records still in stock
    Unsold,
    /// Soft-deleted records
    Deleted,
}

impl RecordStatus {
    const fn where_clause(self) -> &'static str {
        match self {
            Self::All => "is_deleted = 0",
            Self::Sold => "is_deleted = 0 AND date_selling IS NOT NULL",
            Self::Unsold => "is_deleted = 0 AND date_selling IS NULL",
            Self::Deleted => "is_deleted = 1",
        }
    }
}

/// Listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSort {
    /// Most recently modified first
    #[default]
    Recent,
    /// Alphabetical by plate
    Plate,
    /// Newest purchase first
    Purchased,
    /// Highest net profit first
    Profit,
}

impl RecordSort {
    const fn order_clause(self) -> &'static str {
        match self {
            Self::Recent => "updated_at DESC, plate ASC",
            Self::Plate => "plate ASC",
            Self::Purchased => "date_purchase DESC NULLS LAST, plate ASC",
            Self::Profit => "net_profit DESC, plate ASC",
        }
    }
}

/// Filter, order and page for [`RecordRepository::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub status: RecordStatus,
    /// Case-insensitive substring matched against plate and owner
    pub search: Option<String>,
    pub sort: RecordSort,
    /// `None` returns every matching record
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Trait for record storage operations
pub trait RecordRepository {
    /// Record a purchase. Reuses the row of a soft-deleted record with the same plate.
    fn create(&self, purchase: NewPurchase) -> Result<Record>;

    /// Get an active record by plate
    fn get(&self, plate: &str) -> Result<Option<Record>>;

    /// Get a record by plate, including soft-deleted ones
    fn get_any(&self, plate: &str) -> Result<Option<Record>>;

    /// List records matching a query
    fn list(&self, query: &RecordQuery) -> Result<Vec<Record>>;

    /// All active records, ordered by plate
    fn list_active(&self) -> Result<Vec<Record>>;

    /// All records including soft-deleted ones, ordered by plate
    fn list_all(&self) -> Result<Vec<Record>>;

    /// Edit an active record
    fn update(&self, plate: &str, update: &RecordUpdate) -> Result<Record>;

    /// Mark an active record as sold
    fn sell(&self, plate: &str, sale: &Sale) -> Result<Record>;

    /// Soft delete an active record
    fn delete(&self, plate: &str) -> Result<()>;

    /// Clear the soft delete flag
    fn restore(&self, plate: &str) -> Result<Record>;

    /// Insert or replace records verbatim, keeping their timestamps
    fn upsert_many(&self, records: &[Record]) -> Result<usize>;

    /// Run `apply` as one unit. Every write it makes through this store's
    /// connection is rolled back when it returns an error.
    fn atomically<T>(&self, apply: impl FnOnce() -> Result<T>) -> Result<T>;

    /// Permanently remove every record
    fn wipe(&self) -> Result<usize>;
}

/// `SQLite` implementation of `RecordRepository`
pub struct SqliteRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn write(&self, record: &Record) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (
                plate, owner, purchase_price, repair_cost, selling_price,
                date_purchase, date_selling, updated_at, is_deleted
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(plate) DO UPDATE SET
                owner = excluded.owner,
                purchase_price = excluded.purchase_price,
                repair_cost = excluded.repair_cost,
                selling_price = excluded.selling_price,
                date_purchase = excluded.date_purchase,
                date_selling = excluded.date_selling,
                updated_at = excluded.updated_at,
                is_deleted = excluded.is_deleted",
            params![
                record.plate,
                record.owner,
                record.purchase_price,
                record.repair_cost,
                record.selling_price,
                record.date_purchase.map(format_date),
                record.date_selling.map(format_date),
                record.updated_at,
                i32::from(record.deleted),
            ],
        )?;
        Ok(())
    }

    fn query_records(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params, Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn require_active(&self, plate: &str) -> Result<Record> {
        self.get(plate)?
            .ok_or_else(|| Error::NotFound(normalize_plate(plate)))
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
        let date_purchase: Option<String> = row.get(5)?;
        let date_selling: Option<String> = row.get(6)?;
        Ok(Record {
            plate: row.get(0)?,
            owner: row.get(1)?,
            purchase_price: row.get(2)?,
            repair_cost: row.get(3)?,
            selling_price: row.get(4)?,
            date_purchase: date_purchase.as_deref().and_then(parse_date),
            date_selling: date_selling.as_deref().and_then(parse_date),
            updated_at: row.get(7)?,
            deleted: row.get::<_, i32>(8)? != 0,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn like_pattern(search: Option<&str>) -> String {
    let Some(search) = search.map(str::trim).filter(|search| !search.is_empty()) else {
        return "%".to_string();
    };
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create(&self, purchase: NewPurchase) -> Result<Record> {
        let now = unix_millis_now();
        let mut record = Record::from_purchase(purchase, now)?;

        if let Some(existing) = self.get_any(&record.plate)? {
            if !existing.deleted {
                return Err(Error::AlreadyExists(record.plate));
            }
            record.updated_at = Some(next_update_timestamp(existing.updated_at, now));
            tracing::debug!("Reusing soft-deleted row for plate {}", record.plate);
        }

        self.write(&record)?;
        Ok(record)
    }

    fn get(&self, plate: &str) -> Result<Option<Record>> {
        Ok(self
            .get_any(plate)?
            .filter(|record| !record.deleted))
    }

    fn get_any(&self, plate: &str) -> Result<Option<Record>> {
        let record = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE plate = ?"),
                params![normalize_plate(plate)],
                Self::parse_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE {} AND (plate LIKE ?1 ESCAPE '\\' OR owner LIKE ?1 ESCAPE '\\')
             ORDER BY {}
             LIMIT ?2 OFFSET ?3",
            query.status.where_clause(),
            query.sort.order_clause(),
        );
        let limit = query.limit.map_or(-1, |limit| limit as i64);

        self.query_records(
            &sql,
            params![
                like_pattern(query.search.as_deref()),
                limit,
                query.offset as i64
            ],
        )
    }

    fn list_active(&self) -> Result<Vec<Record>> {
        self.query_records(
            &format!("{SELECT_COLUMNS} WHERE is_deleted = 0 ORDER BY plate ASC"),
            [],
        )
    }

    fn list_all(&self) -> Result<Vec<Record>> {
        self.query_records(&format!("{SELECT_COLUMNS} ORDER BY plate ASC"), [])
    }

    fn update(&self, plate: &str, update: &RecordUpdate) -> Result<Record> {
        let mut record = self.require_active(plate)?;
        record.apply_update(update, unix_millis_now())?;
        self.write(&record)?;
        Ok(record)
    }

    fn sell(&self, plate: &str, sale: &Sale) -> Result<Record> {
        let mut record = self.require_active(plate)?;
        record.apply_sale(sale, unix_millis_now())?;
        self.write(&record)?;
        Ok(record)
    }

    fn delete(&self, plate: &str) -> Result<()> {
        let mut record = self.require_active(plate)?;
        record.deleted = true;
        record.touch(unix_millis_now());
        self.write(&record)
    }

    fn restore(&self, plate: &str) -> Result<Record> {
        let mut record = self
            .get_any(plate)?
            .filter(|record| record.deleted)
            .ok_or_else(|| Error::NotFound(normalize_plate(plate)))?;
        record.deleted = false;
        record.touch(unix_millis_now());
        self.write(&record)?;
        Ok(record)
    }

    fn upsert_many(&self, records: &[Record]) -> Result<usize> {
        let write_all = || -> Result<usize> {
            for record in records {
                self.write(record)?;
            }
            Ok(records.len())
        };
        // Already inside a caller's transaction
        if self.conn.is_autocommit() {
            self.atomically(write_all)
        } else {
            write_all()
        }
    }

    fn atomically<T>(&self, apply: impl FnOnce() -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = apply()?;
        tx.commit()?;
        Ok(value)
    }

    fn wipe(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM records", [])?;
        tracing::info!("Wiped {removed} records");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn purchase(plate: &str, price: f64) -> NewPurchase {
        NewPurchase {
            plate: plate.to_string(),
            owner: "Ravi".to_string(),
            purchase_price: price,
            repair_cost: 0.0,
            date_purchase: Some(date("2024-01-01")),
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let record = repo.create(purchase(" gj1 ", 10_000.0)).unwrap();
        assert_eq!(record.plate, "GJ1");

        let fetched = repo.get("gj1").unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn test_create_rejects_duplicate_active_plate() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        repo.create(purchase("GJ1", 1.0)).unwrap();
        let result = repo.create(purchase("gj1", 2.0));
        assert!(matches!(result, Err(Error::AlreadyExists(plate)) if plate == "GJ1"));
    }

    #[test]
    fn test_create_revives_deleted_plate_with_newer_timestamp() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        repo.create(purchase("GJ1", 1.0)).unwrap();
        repo.delete("GJ1").unwrap();
        let deleted = repo.get_any("GJ1").unwrap().unwrap();

        let revived = repo.create(purchase("GJ1", 2.0)).unwrap();
        assert!(!revived.deleted);
        assert_eq!(revived.purchase_price, 2.0);
        assert!(revived.updated_at > deleted.updated_at);
    }

    #[test]
    fn test_sell_updates_profit() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let mut bought = purchase("GJ1", 10_000.0);
        bought.repair_cost = 500.0;
        let created = repo.create(bought).unwrap();

        let sold = repo
            .sell(
                "GJ1",
                &Sale {
                    selling_price: 12_000.0,
                    date_selling: date("2024-02-01"),
                },
            )
            .unwrap();

        assert!(sold.is_sold());
        assert_eq!(sold.net_profit(), 1_500.0);
        assert!(sold.updated_at > created.updated_at);
        assert_eq!(repo.get("GJ1").unwrap().unwrap(), sold);
    }

    #[test]
    fn test_sell_missing_plate() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let result = repo.sell(
            "NOPE",
            &Sale {
                selling_price: 1.0,
                date_selling: date("2024-02-01"),
            },
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_applies_partial_edit() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(purchase("GJ1", 10_000.0)).unwrap();

        let updated = repo
            .update(
                "GJ1",
                &RecordUpdate {
                    owner: Some("Asha".to_string()),
                    repair_cost: Some(750.0),
                    ..RecordUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.owner, "Asha");
        assert_eq!(updated.repair_cost, 750.0);
        assert_eq!(updated.purchase_price, 10_000.0);
    }

    #[test]
    fn test_delete_and_restore() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(purchase("GJ1", 1.0)).unwrap();

        repo.delete("GJ1").unwrap();
        assert!(repo.get("GJ1").unwrap().is_none());
        assert!(repo.list_active().unwrap().is_empty());
        assert_eq!(repo.list_all().unwrap().len(), 1);
        assert!(matches!(repo.delete("GJ1"), Err(Error::NotFound(_))));

        let restored = repo.restore("gj1").unwrap();
        assert!(!restored.deleted);
        assert!(repo.get("GJ1").unwrap().is_some());
        assert!(matches!(repo.restore("GJ1"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        repo.create(purchase("AA1", 100.0)).unwrap();
        repo.create(purchase("BB2", 300.0)).unwrap();
        let mut third = purchase("CC3", 200.0);
        third.owner = "Meera 100%".to_string();
        repo.create(third).unwrap();
        repo.sell(
            "BB2",
            &Sale {
                selling_price: 1_000.0,
                date_selling: date("2024-02-01"),
            },
        )
        .unwrap();

        let plates = |records: Vec<Record>| {
            records
                .into_iter()
                .map(|record| record.plate)
                .collect::<Vec<_>>()
        };

        let sold = repo
            .list(&RecordQuery {
                status: RecordStatus::Sold,
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(plates(sold), vec!["BB2"]);

        let unsold = repo
            .list(&RecordQuery {
                status: RecordStatus::Unsold,
                sort: RecordSort::Plate,
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(plates(unsold), vec!["AA1", "CC3"]);

        let by_profit = repo
            .list(&RecordQuery {
                sort: RecordSort::Profit,
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(plates(by_profit), vec!["BB2", "AA1", "CC3"]);

        let searched = repo
            .list(&RecordQuery {
                search: Some("100%".to_string()),
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(plates(searched), vec!["CC3"]);

        let paged = repo
            .list(&RecordQuery {
                sort: RecordSort::Plate,
                limit: Some(1),
                offset: 1,
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(plates(paged), vec!["BB2"]);
    }

    #[test]
    fn test_list_deleted_status() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(purchase("AA1", 1.0)).unwrap();
        repo.create(purchase("BB2", 1.0)).unwrap();
        repo.delete("AA1").unwrap();

        let deleted = repo
            .list(&RecordQuery {
                status: RecordStatus::Deleted,
                ..RecordQuery::default()
            })
            .unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].plate, "AA1");
    }

    #[test]
    fn test_upsert_many_keeps_timestamps() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(purchase("AA1", 1.0)).unwrap();

        let incoming = vec![
            Record {
                plate: "AA1".to_string(),
                owner: "Remote".to_string(),
                purchase_price: 5.0,
                repair_cost: 0.0,
                selling_price: 0.0,
                date_purchase: None,
                date_selling: None,
                updated_at: Some(42),
                deleted: false,
            },
            Record {
                plate: "ZZ9".to_string(),
                owner: String::new(),
                purchase_price: 0.0,
                repair_cost: 0.0,
                selling_price: 0.0,
                date_purchase: None,
                date_selling: None,
                updated_at: None,
                deleted: true,
            },
        ];

        assert_eq!(repo.upsert_many(&incoming).unwrap(), 2);
        assert_eq!(repo.list_all().unwrap(), incoming);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(purchase("AA1", 1.0)).unwrap();

        let result: Result<()> = repo.atomically(|| {
            repo.upsert_many(&[Record {
                plate: "ZZ9".to_string(),
                owner: String::new(),
                purchase_price: 0.0,
                repair_cost: 0.0,
                selling_price: 0.0,
                date_purchase: None,
                date_selling: None,
                updated_at: Some(7),
                deleted: false,
            }])?;
            Err(Error::InvalidInput("abort".to_string()))
        });

        assert!(result.is_err());
        let plates = repo
            .list_all()
            .unwrap()
            .into_iter()
            .map(|record| record.plate)
            .collect::<Vec<_>>();
        assert_eq!(plates, vec!["AA1".to_string()]);
        assert!(db.connection().is_autocommit());
    }

    #[test]
    fn test_wipe_removes_everything() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());
        repo.create(purchase("AA1", 1.0)).unwrap();
        repo.create(purchase("BB2", 1.0)).unwrap();
        repo.delete("BB2").unwrap();

        assert_eq!(repo.wipe().unwrap(), 2);
        assert!(repo.list_all().unwrap().is_empty());
    }
}
