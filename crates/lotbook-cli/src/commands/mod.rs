pub mod buy;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod export;
pub mod import;
pub mod list;
pub mod sell;
pub mod show;
pub mod stats;
pub mod sync;
pub mod token;
