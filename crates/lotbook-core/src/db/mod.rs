//! Database layer for lotbook

mod connection;
mod migrations;
mod repository;
mod settings_repository;

pub use connection::Database;
pub use repository::{
    RecordQuery, RecordRepository, RecordSort, RecordStatus, SqliteRecordRepository,
};
pub use settings_repository::{SqliteSyncStateRepository, SyncStateRepository};
