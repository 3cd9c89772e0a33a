use std::io;

use lotbook_core::sync::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] lotbook_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Plate cannot be empty")]
    EmptyPlate,
    #[error("No record found for plate {0}")]
    RecordNotFound(String),
    #[error("Invalid date {0:?}; expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Nothing to change; pass at least one field to edit")]
    EmptyEdit,
    #[error("Refusing to wipe without --yes")]
    WipeNotConfirmed,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Credential storage error: {0}")]
    Credentials(String),
    #[error(
        "Sync is not configured. Run `lotbook config init --gist-id <id>` and `lotbook token set`, or set LOTBOOK_GIST_TOKEN."
    )]
    SyncNotConfigured,
}
