use std::path::Path;

use lotbook_core::db::RecordQuery;

use crate::commands::common::{
    format_record_lines, open_ledger, record_to_list_item, RecordListItem,
};
use crate::error::CliError;

pub async fn run_list(query: &RecordQuery, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let ledger = open_ledger(db_path)?;
    let records = ledger.list(query).await?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No records.");
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
