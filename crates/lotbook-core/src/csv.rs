//! CSV snapshot codec.
//!
//! Writes a fixed ten-column layout with every field quoted and CRLF row
//! separators. Reading is lenient: columns are matched by header name, short
//! rows are padded, numbers are coerced, and `netProfit` is never trusted.

use crate::models::{format_timestamp, normalize_plate, parse_date, parse_timestamp, Record};

/// Column names in write order.
pub const COLUMNS: [&str; 10] = [
    "plate",
    "owner",
    "purchasePrice",
    "repairCost",
    "sellingPrice",
    "netProfit",
    "datePurchase",
    "dateSelling",
    "updatedAt",
    "deleted",
];

const ROW_SEPARATOR: &str = "\r\n";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Plate,
    Owner,
    PurchasePrice,
    RepairCost,
    SellingPrice,
    NetProfit,
    DatePurchase,
    DateSelling,
    UpdatedAt,
    Deleted,
}

impl Column {
    const ALL: [Self; 10] = [
        Self::Plate,
        Self::Owner,
        Self::PurchasePrice,
        Self::RepairCost,
        Self::SellingPrice,
        Self::NetProfit,
        Self::DatePurchase,
        Self::DateSelling,
        Self::UpdatedAt,
        Self::Deleted,
    ];

    const fn name(self) -> &'static str {
        COLUMNS[self as usize]
    }

    /// Match a header cell, ignoring case, `_`, `-` and spaces.
    fn from_header(cell: &str) -> Option<Self> {
        let wanted = header_key(cell);
        Self::ALL
            .into_iter()
            .find(|column| header_key(column.name()) == wanted)
    }
}

fn header_key(cell: &str) -> String {
    cell.trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Encode records as CSV text. The header row is always present.
#[must_use]
pub fn encode_records(records: &[Record]) -> String {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(encode_row(COLUMNS.iter().map(|name| (*name).to_string())));
    rows.extend(records.iter().map(|record| encode_row(record_fields(record))));
    rows.join(ROW_SEPARATOR)
}

fn record_fields(record: &Record) -> impl Iterator<Item = String> {
    [
        record.plate.clone(),
        record.owner.clone(),
        record.purchase_price.to_string(),
        record.repair_cost.to_string(),
        record.selling_price.to_string(),
        record.net_profit().to_string(),
        record
            .date_purchase
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        record
            .date_selling
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        record.updated_at.map(format_timestamp).unwrap_or_default(),
        record.deleted.to_string(),
    ]
    .into_iter()
}

fn encode_row(fields: impl Iterator<Item = String>) -> String {
    fields
        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode CSV text into records.
///
/// Never fails: empty input yields an empty list, unknown columns are
/// ignored and rows without a plate are skipped.
#[must_use]
pub fn decode_records(text: &str) -> Vec<Record> {
    let mut rows = parse_rows(text).into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let mut positions = [None; 10];
    for (index, cell) in header.iter().enumerate() {
        if let Some(column) = Column::from_header(cell) {
            positions[column as usize].get_or_insert(index);
        }
    }
    if positions[Column::Plate as usize].is_none() {
        tracing::warn!("CSV header has no plate column; no records decoded");
        return Vec::new();
    }

    rows.filter_map(|row| {
        let value = |column: Column| cell(&row, positions[column as usize]);

        let plate = normalize_plate(value(Column::Plate));
        if plate.is_empty() {
            tracing::debug!("Skipping CSV row without a plate");
            return None;
        }

        Some(Record {
            plate,
            owner: value(Column::Owner).to_string(),
            purchase_price: coerce_amount(value(Column::PurchasePrice)),
            repair_cost: coerce_amount(value(Column::RepairCost)),
            selling_price: coerce_amount(value(Column::SellingPrice)),
            date_purchase: parse_date(value(Column::DatePurchase)),
            date_selling: parse_date(value(Column::DateSelling)),
            updated_at: parse_timestamp(value(Column::UpdatedAt)),
            deleted: parse_flag(value(Column::Deleted)),
        })
    })
    .collect()
}

fn cell(row: &[String], position: Option<usize>) -> &str {
    position
        .and_then(|index| row.get(index))
        .map_or("", String::as_str)
}

/// Numbers that do not parse, are not finite, or are negative become 0.
fn coerce_amount(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

/// Split CSV text into rows of unquoted fields (RFC 4180).
///
/// Accepts CRLF, LF or lone CR line endings, doubled quotes and quoted line
/// breaks. Lines that are blank (whitespace only, unquoted) are dropped.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut end_row = |row: &mut Vec<String>, field: &mut String, quoted: &mut bool| {
        row.push(std::mem::take(field));
        let blank = row.len() == 1 && !*quoted && row[0].trim().is_empty();
        let finished = std::mem::take(row);
        if !blank {
            rows.push(finished);
        }
        *quoted = false;
    };

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quoted = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => end_row(&mut row, &mut field, &mut quoted),
            _ => field.push(c),
        }
    }

    if !row.is_empty() || !field.is_empty() || quoted {
        end_row(&mut row, &mut field, &mut quoted);
    }

    rows
}
