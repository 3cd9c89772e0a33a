//! Application services shared by the front ends.

mod ledger;

pub use ledger::{ImportReport, LedgerService};
