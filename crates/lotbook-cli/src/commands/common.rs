use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use lotbook_core::models::{normalize_plate, parse_date, SyncSettings};
use lotbook_core::{LedgerService, Record};
use serde::Serialize;

use crate::config_profiles::CliProfilesConfig;
use crate::credentials::resolve_token;
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListItem {
    pub plate: String,
    pub owner: String,
    pub purchase_price: f64,
    pub repair_cost: f64,
    pub selling_price: f64,
    pub net_profit: f64,
    pub date_purchase: Option<NaiveDate>,
    pub date_selling: Option<NaiveDate>,
    pub updated_at: Option<i64>,
    pub relative_time: String,
    pub deleted: bool,
}

pub fn record_to_list_item(record: &Record) -> RecordListItem {
    let now_ms = Utc::now().timestamp_millis();
    RecordListItem {
        plate: record.plate.clone(),
        owner: record.owner.clone(),
        purchase_price: record.purchase_price,
        repair_cost: record.repair_cost,
        selling_price: record.selling_price,
        net_profit: record.net_profit(),
        date_purchase: record.date_purchase,
        date_selling: record.date_selling,
        updated_at: record.updated_at,
        relative_time: record
            .updated_at
            .map_or_else(|| "unknown".to_string(), |at| format_relative_time(at, now_ms)),
        deleted: record.deleted,
    }
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let status = if record.deleted {
                "deleted"
            } else if record.is_sold() {
                "sold"
            } else {
                "in stock"
            };
            let owner = truncate(&record.owner, 16);
            let relative_time = record
                .updated_at
                .map_or_else(|| "unknown".to_string(), |at| format_relative_time(at, now_ms));
            format!(
                "{:<14}  {owner:<16}  {:<8}  cost {:>10}  profit {:>10}  {relative_time}",
                record.plate,
                status,
                format_amount(record.total_cost()),
                if record.is_sold() {
                    format_amount(record.net_profit())
                } else {
                    "-".to_string()
                },
            )
        })
        .collect()
}

pub fn format_record_details(record: &Record) -> Vec<String> {
    let mut lines = vec![
        format!("Plate:          {}", record.plate),
        format!("Owner:          {}", record.owner),
        format!("Purchase price: {}", format_amount(record.purchase_price)),
        format!("Repair cost:    {}", format_amount(record.repair_cost)),
        format!("Purchased on:   {}", format_optional_date(record.date_purchase)),
    ];
    if record.is_sold() {
        lines.push(format!(
            "Selling price:  {}",
            format_amount(record.selling_price)
        ));
        lines.push(format!(
            "Sold on:        {}",
            format_optional_date(record.date_selling)
        ));
        lines.push(format!(
            "Net profit:     {}",
            format_amount(record.net_profit())
        ));
        lines.push(format!(
            "Margin:         {}",
            format_percent(record.margin_percent())
        ));
    } else {
        lines.push("Status:         in stock".to_string());
    }
    lines.push(format!(
        "Updated:        {}",
        record
            .updated_at
            .map_or_else(|| "unknown".to_string(), format_sync_timestamp)
    ));
    if record.deleted {
        lines.push("Deleted:        yes".to_string());
    }
    lines
}

pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{value:.1}%"))
}

fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |date| date.to_string())
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let mut truncated = value
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_plate_arg(plate: &str) -> Result<String, CliError> {
    let plate = normalize_plate(plate);
    if plate.is_empty() {
        Err(CliError::EmptyPlate)
    } else {
        Ok(plate)
    }
}

pub fn parse_date_arg(value: &str) -> Result<NaiveDate, CliError> {
    parse_date(value).ok_or_else(|| CliError::InvalidDate(value.to_string()))
}

pub fn parse_optional_date_arg(value: Option<&str>) -> Result<Option<NaiveDate>, CliError> {
    value.map(parse_date_arg).transpose()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("LOTBOOK_DB_PATH").map(PathBuf::from))
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("lotbook").join("lotbook.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn open_ledger(path: &Path) -> Result<LedgerService, CliError> {
    Ok(LedgerService::open_path(path)?)
}

/// Sync settings for a profile, or `SyncNotConfigured` when the gist id or
/// token is missing.
pub fn sync_settings_from_profile(profile: Option<&str>) -> Result<SyncSettings, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let token = resolve_token(&profile_name)?.map(|(token, _)| token);
    let settings = profile.sync_settings(token);
    if !settings.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    tracing::debug!("Using sync profile '{}'", profile_name);
    Ok(settings)
}
