use std::path::Path;

use crate::commands::common::{
    format_record_details, normalize_plate_arg, open_ledger, record_to_list_item,
};
use crate::error::CliError;

pub async fn run_show(plate: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let plate = normalize_plate_arg(plate)?;
    let ledger = open_ledger(db_path)?;
    let record = ledger
        .get(&plate)
        .await?
        .ok_or_else(|| CliError::RecordNotFound(plate.clone()))?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record_to_list_item(&record))?
        );
    } else {
        for line in format_record_details(&record) {
            println!("{line}");
        }
    }
    Ok(())
}
