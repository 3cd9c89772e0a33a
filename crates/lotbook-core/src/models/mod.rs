//! Data models for lotbook

mod record;
mod settings;
mod sync_run;

pub use record::{
    format_timestamp, next_update_timestamp, normalize_plate, parse_date, parse_timestamp,
    NewPurchase, Record, RecordUpdate, Sale,
};
pub use settings::{SyncSettings, SyncState, DEFAULT_API_BASE_URL, DEFAULT_SNAPSHOT_FILENAME};
pub use sync_run::SyncRun;
