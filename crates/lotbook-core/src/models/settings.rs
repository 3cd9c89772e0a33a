//! Sync settings model

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;

/// Default file name of the CSV snapshot inside the gist.
pub const DEFAULT_SNAPSHOT_FILENAME: &str = "lotbook.csv";

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Where and how to sync, plus what the last successful cycle saw.
///
/// The access token is session-only: it is skipped by serde and redacted
/// from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Gist identifier
    pub gist_id: Option<String>,
    /// File inside the gist holding the CSV snapshot
    pub filename: String,
    /// GitHub personal access token with `gist` scope
    #[serde(skip)]
    pub token: Option<String>,
    /// REST API base URL (override for GitHub Enterprise)
    pub api_base_url: String,
    /// Revision id seen by the last successful cycle
    pub last_version: Option<String>,
    /// Last successful sync time (Unix ms)
    pub last_synced_at: Option<i64>,
}

impl SyncSettings {
    /// Settings for a gist with the default filename and API.
    pub fn new(gist_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            gist_id: Some(gist_id.into()),
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Trimmed gist id, if any.
    pub fn gist_id(&self) -> Option<String> {
        normalize_text_option(self.gist_id.clone())
    }

    /// Trimmed token, if any.
    pub fn token(&self) -> Option<String> {
        normalize_text_option(self.token.clone())
    }

    /// Snapshot filename, falling back to the default when blank.
    pub fn filename(&self) -> String {
        normalize_text_option(Some(self.filename.clone()))
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_FILENAME.to_string())
    }

    /// Check if both the resource id and the credential are present
    pub fn is_configured(&self) -> bool {
        self.gist_id().is_some() && self.token().is_some()
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            gist_id: None,
            filename: DEFAULT_SNAPSHOT_FILENAME.to_string(),
            token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            last_version: None,
            last_synced_at: None,
        }
    }
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("gist_id", &self.gist_id)
            .field("filename", &self.filename)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .field("last_version", &self.last_version)
            .field("last_synced_at", &self.last_synced_at)
            .finish()
    }
}

/// Sync bookkeeping persisted in the local database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_version: Option<String>,
    pub last_synced_at: Option<i64>,
}
