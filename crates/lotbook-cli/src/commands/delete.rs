use std::path::Path;

use crate::commands::common::{normalize_plate_arg, open_ledger};
use crate::error::CliError;

pub async fn run_delete(plate: &str, db_path: &Path) -> Result<(), CliError> {
    let plate = normalize_plate_arg(plate)?;
    let ledger = open_ledger(db_path)?;

    ledger.delete(&plate).await?;
    println!("{plate}");
    Ok(())
}

pub async fn run_restore(plate: &str, db_path: &Path) -> Result<(), CliError> {
    let plate = normalize_plate_arg(plate)?;
    let ledger = open_ledger(db_path)?;

    let record = ledger.restore(&plate).await?;
    println!("{}", record.plate);
    Ok(())
}

pub async fn run_wipe(confirmed: bool, db_path: &Path) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::WipeNotConfirmed);
    }

    let ledger = open_ledger(db_path)?;
    let removed = ledger.wipe().await?;
    println!("Removed {removed} records");
    Ok(())
}
