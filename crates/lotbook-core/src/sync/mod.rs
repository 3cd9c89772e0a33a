//! Record synchronization with a remote CSV snapshot.
//!
//! A cycle pulls the snapshot, merges it with every local record using
//! last-write-wins on `updated_at`, pushes the merged snapshot when it
//! differs, and only then commits the merge locally.

mod gist;
mod merge;
mod reconciler;

use thiserror::Error;

pub use gist::GistClient;
pub use merge::{merge_records, remote_wins, MergeOutcome};
pub use reconciler::{Reconciler, SyncReport};

/// Errors surfaced by a sync cycle
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote could not be reached
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Missing gist id, token, or a usable API URL
    #[error("Sync is not configured: {0}")]
    NotConfigured(String),

    /// The remote rejected the credential
    #[error("Remote rejected the access token: {0}")]
    AuthInvalid(String),

    /// The remote changed after it was read
    #[error(
        "Remote snapshot changed since it was read (expected {}, found {}); re-run sync",
        describe_version(.expected.as_deref()),
        describe_version(.actual.as_deref())
    )]
    Conflict {
        expected: Option<String>,
        actual: Option<String>,
    },

    /// The remote exists but does not hold a readable snapshot
    #[error("Remote content is malformed: {reason}")]
    MalformedRemoteContent {
        version: Option<String>,
        reason: String,
    },

    /// Local store failure
    #[error(transparent)]
    Local(#[from] crate::Error),

    #[error("Sync failed: {0}")]
    Unknown(String),
}

fn describe_version(version: Option<&str>) -> &str {
    version.unwrap_or("no snapshot")
}

/// Result type alias for sync operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// A remote CSV snapshot and the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub content: String,
    pub version: Option<String>,
}

/// Remote snapshot storage with optimistic concurrency.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Read the current snapshot. `Ok(None)` when the resource does not exist.
    async fn fetch(&self) -> SyncResult<Option<RemoteSnapshot>>;

    /// Replace the snapshot if the remote is still at `expected_version`.
    ///
    /// Returns the new version token, or [`SyncError::Conflict`] when the
    /// remote moved on.
    async fn push(&self, content: &str, expected_version: Option<&str>) -> SyncResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_both_versions() {
        let error = SyncError::Conflict {
            expected: Some("v1".to_string()),
            actual: None,
        };
        let message = error.to_string();
        assert!(message.contains("expected v1"));
        assert!(message.contains("found no snapshot"));
    }
}
