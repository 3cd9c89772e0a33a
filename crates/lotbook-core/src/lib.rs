//! lotbook-core - Core library for lotbook
//!
//! This crate contains the record model, the CSV snapshot codec, the local
//! `SQLite` store, dashboard maths, and the gist sync engine used by every
//! lotbook front end.

pub mod csv;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod stats;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::Record;
pub use services::LedgerService;
