//! Vehicle record model

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Normalize a plate into its key form: trimmed, inner whitespace collapsed,
/// upper-cased.
///
/// # Examples
///
/// ```
/// use lotbook_core::models::normalize_plate;
///
/// assert_eq!(normalize_plate("  gj01 ab  1234 "), "GJ01 AB 1234");
/// ```
#[must_use]
pub fn normalize_plate(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").to_uppercase()
}

/// A tracked vehicle's purchase/sale entry.
///
/// Net profit is not stored on the struct: it is always derived from the
/// three price fields via [`Record::net_profit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Normalized plate, the business key
    pub plate: String,
    /// Free-text owner / seller name
    pub owner: String,
    pub purchase_price: f64,
    pub repair_cost: f64,
    pub selling_price: f64,
    pub date_purchase: Option<NaiveDate>,
    /// `None` means the vehicle is still in stock
    pub date_selling: Option<NaiveDate>,
    /// Last mutation time (Unix ms); `None` when a remote value could not be parsed
    pub updated_at: Option<i64>,
    /// Soft delete flag, retained for sync and restore
    pub deleted: bool,
}

impl Record {
    /// Create an unsold record from a validated purchase.
    pub fn from_purchase(purchase: NewPurchase, now_ms: i64) -> Result<Self> {
        let purchase = purchase.validated()?;
        Ok(Self {
            plate: purchase.plate,
            owner: purchase.owner,
            purchase_price: purchase.purchase_price,
            repair_cost: purchase.repair_cost,
            selling_price: 0.0,
            date_purchase: purchase.date_purchase,
            date_selling: None,
            updated_at: Some(now_ms),
            deleted: false,
        })
    }

    /// `sellingPrice - (purchasePrice + repairCost)`
    #[must_use]
    pub fn net_profit(&self) -> f64 {
        self.selling_price - (self.purchase_price + self.repair_cost)
    }

    /// Money sunk into the vehicle so far
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.purchase_price + self.repair_cost
    }

    #[must_use]
    pub const fn is_sold(&self) -> bool {
        self.date_selling.is_some()
    }

    /// Profit as a percentage of the selling price.
    #[must_use]
    pub fn margin_percent(&self) -> Option<f64> {
        (self.selling_price > 0.0).then(|| self.net_profit() / self.selling_price * 100.0)
    }

    /// Profit as a percentage of the total cost.
    #[must_use]
    pub fn roi_percent(&self) -> Option<f64> {
        let cost = self.total_cost();
        (cost > 0.0).then(|| self.net_profit() / cost * 100.0)
    }

    /// Days between purchase and sale, or between purchase and `today` when unsold.
    #[must_use]
    pub fn days_held(&self, today: NaiveDate) -> Option<i64> {
        let start = self.date_purchase?;
        let end = self.date_selling.unwrap_or(today);
        Some((end - start).num_days().max(0))
    }

    /// Bump `updated_at` for a local mutation.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = Some(next_update_timestamp(self.updated_at, now_ms));
    }

    /// Apply a sale, marking the record as sold.
    pub fn apply_sale(&mut self, sale: &Sale, now_ms: i64) -> Result<()> {
        self.selling_price = validate_amount("selling price", sale.selling_price)?;
        self.date_selling = Some(sale.date_selling);
        self.touch(now_ms);
        Ok(())
    }

    /// Apply a partial edit.
    pub fn apply_update(&mut self, update: &RecordUpdate, now_ms: i64) -> Result<()> {
        if let Some(owner) = &update.owner {
            self.owner = owner.trim().to_string();
        }
        if let Some(value) = update.purchase_price {
            self.purchase_price = validate_amount("purchase price", value)?;
        }
        if let Some(value) = update.repair_cost {
            self.repair_cost = validate_amount("repair cost", value)?;
        }
        if let Some(value) = update.selling_price {
            self.selling_price = validate_amount("selling price", value)?;
        }
        if let Some(date) = update.date_purchase {
            self.date_purchase = Some(date);
        }
        if let Some(date) = update.date_selling {
            self.date_selling = Some(date);
        }
        if update.clear_sale {
            self.date_selling = None;
            self.selling_price = 0.0;
        }
        self.touch(now_ms);
        Ok(())
    }
}

/// Input for the "buy" action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPurchase {
    pub plate: String,
    pub owner: String,
    pub purchase_price: f64,
    pub repair_cost: f64,
    pub date_purchase: Option<NaiveDate>,
}

impl NewPurchase {
    fn validated(self) -> Result<Self> {
        let plate = normalize_plate(&self.plate);
        if plate.is_empty() {
            return Err(Error::InvalidInput("plate must not be empty".into()));
        }
        Ok(Self {
            plate,
            owner: self.owner.trim().to_string(),
            purchase_price: validate_amount("purchase price", self.purchase_price)?,
            repair_cost: validate_amount("repair cost", self.repair_cost)?,
            date_purchase: self.date_purchase,
        })
    }
}

/// Input for the "sell" action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sale {
    pub selling_price: f64,
    pub date_selling: NaiveDate,
}

/// Partial edit of an existing record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub owner: Option<String>,
    pub purchase_price: Option<f64>,
    pub repair_cost: Option<f64>,
    pub selling_price: Option<f64>,
    pub date_purchase: Option<NaiveDate>,
    pub date_selling: Option<NaiveDate>,
    /// Mark the vehicle as back in stock
    pub clear_sale: bool,
}

impl RecordUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.owner.is_none()
            && self.purchase_price.is_none()
            && self.repair_cost.is_none()
            && self.selling_price.is_none()
            && self.date_purchase.is_none()
            && self.date_selling.is_none()
            && !self.clear_sale
    }
}

fn validate_amount(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidInput(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}

/// Next `updated_at` for a record: now, but always past the previous value.
#[must_use]
pub fn next_update_timestamp(previous: Option<i64>, now_ms: i64) -> i64 {
    previous.map_or(now_ms, |previous| now_ms.max(previous.saturating_add(1)))
}

/// Parse an `updatedAt` value written as epoch ms or ISO text.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates
/// (midnight UTC). Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Some(date_time.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Render epoch ms as RFC 3339 UTC with millisecond precision.
#[must_use]
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |date_time| date_time.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Parse a calendar date (`YYYY-MM-DD`, or the date part of an ISO date-time).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    })
}
