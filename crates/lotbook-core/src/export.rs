//! Record export helpers shared by every front end.

use serde::{Deserialize, Serialize};

use crate::csv::encode_records;
use crate::models::{format_timestamp, Record};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Serializable record representation used in JSON exports.
///
/// Unlike [`Record`] this carries the derived net profit and a readable
/// update time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub plate: String,
    pub owner: String,
    pub purchase_price: f64,
    pub repair_cost: f64,
    pub selling_price: f64,
    pub net_profit: f64,
    pub date_purchase: Option<String>,
    pub date_selling: Option<String>,
    pub updated_at: Option<String>,
    pub deleted: bool,
}

#[must_use]
pub fn record_to_export_item(record: &Record) -> ExportRecord {
    ExportRecord {
        plate: record.plate.clone(),
        owner: record.owner.clone(),
        purchase_price: record.purchase_price,
        repair_cost: record.repair_cost,
        selling_price: record.selling_price,
        net_profit: record.net_profit(),
        date_purchase: record.date_purchase.map(|date| date.to_string()),
        date_selling: record.date_selling.map(|date| date.to_string()),
        updated_at: record.updated_at.map(format_timestamp),
        deleted: record.deleted,
    }
}

/// Render records as pretty-printed JSON.
pub fn render_json_export(records: &[Record]) -> serde_json::Result<String> {
    let items = records
        .iter()
        .map(record_to_export_item)
        .collect::<Vec<ExportRecord>>();
    serde_json::to_string_pretty(&items)
}

/// Render records in the sync snapshot CSV layout.
#[must_use]
pub fn render_csv_export(records: &[Record]) -> String {
    encode_records(records)
}

/// Render records based on selected export format.
pub fn render_records_export(records: &[Record], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Csv => Ok(render_csv_export(records)),
        ExportFormat::Json => render_json_export(records),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("lotbook-export-{timestamp_ms}.{}", format.extension())
}
