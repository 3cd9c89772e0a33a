use std::path::Path;

use crate::commands::common::open_ledger;
use crate::error::CliError;

pub async fn run_import(csv_path: &Path, db_path: &Path) -> Result<(), CliError> {
    let text = std::fs::read_to_string(csv_path)?;
    let ledger = open_ledger(db_path)?;
    let report = ledger.import_csv(&text).await?;

    println!(
        "Read {} rows: {} inserted, {} updated",
        report.rows, report.inserted, report.updated
    );
    Ok(())
}
