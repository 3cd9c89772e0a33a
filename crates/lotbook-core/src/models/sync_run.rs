//! Sync run history model

use serde::{Deserialize, Serialize};

/// One completed reconcile cycle, as recorded in the local history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    /// History row identifier
    pub id: i64,
    /// Completion time (Unix ms)
    pub synced_at: i64,
    /// Remote revision after the cycle
    pub version: Option<String>,
    /// Whether a new snapshot was uploaded
    pub pushed: bool,
    /// Remote-only records added locally
    pub inserted: usize,
    /// Local records replaced by newer remote ones
    pub updated: usize,
    /// Records in the merged set
    pub total: usize,
}
