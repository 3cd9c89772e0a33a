use std::path::Path;

use lotbook_core::models::RecordUpdate;

use crate::commands::common::{format_record_details, normalize_plate_arg, open_ledger};
use crate::error::CliError;

pub async fn run_edit(plate: &str, update: &RecordUpdate, db_path: &Path) -> Result<(), CliError> {
    let plate = normalize_plate_arg(plate)?;
    if update.is_empty() {
        return Err(CliError::EmptyEdit);
    }

    let ledger = open_ledger(db_path)?;
    let record = ledger.update(&plate, update).await?;
    for line in format_record_details(&record) {
        println!("{line}");
    }
    Ok(())
}
