//! Dashboard figures computed over active records.

#![allow(clippy::cast_precision_loss)] // counts and day spans stay far below 2^52

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Record;

/// Default moving-average window for the monthly profit series.
pub const DEFAULT_TREND_WINDOW: usize = 3;

/// Unsold stock grouped by days since purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingBuckets {
    pub up_to_30: usize,
    pub days_31_to_60: usize,
    pub days_61_to_90: usize,
    pub over_90: usize,
    /// Unsold records without a purchase date
    pub unknown: usize,
}

impl AgingBuckets {
    fn add(&mut self, days: Option<i64>) {
        match days {
            None => self.unknown += 1,
            Some(0..=30) => self.up_to_30 += 1,
            Some(31..=60) => self.days_31_to_60 += 1,
            Some(61..=90) => self.days_61_to_90 += 1,
            Some(_) => self.over_90 += 1,
        }
    }
}

/// A sold record summarized for best/worst reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummary {
    pub plate: String,
    pub net_profit: f64,
}

/// Realized profit for one calendar month of sales.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProfit {
    /// `YYYY-MM`
    pub month: String,
    pub profit: f64,
    /// Trailing average over the configured window, including this month
    pub moving_average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total: usize,
    pub sold: usize,
    pub in_stock: usize,
    /// Purchase plus repair over every active record
    pub total_invested: f64,
    /// Cost of unsold records
    pub stock_value: f64,
    pub revenue: f64,
    pub realized_profit: f64,
    /// Realized profit over revenue
    pub average_margin_percent: Option<f64>,
    pub roi_percent: Option<f64>,
    pub average_days_to_sell: Option<f64>,
    pub best_sale: Option<SaleSummary>,
    pub worst_sale: Option<SaleSummary>,
    pub aging: AgingBuckets,
    pub monthly: Vec<MonthlyProfit>,
}

/// Compute the dashboard for `records` as of `today`.
///
/// Soft-deleted records are ignored. A `window` of zero is treated as one.
#[must_use]
pub fn compute_dashboard(records: &[Record], today: NaiveDate, window: usize) -> Dashboard {
    let mut dashboard = Dashboard::default();
    let mut sold_cost = 0.0;
    let mut days_to_sell = Vec::new();
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();

    for record in records.iter().filter(|record| !record.deleted) {
        dashboard.total += 1;
        dashboard.total_invested += record.total_cost();

        let Some(date_selling) = record.date_selling else {
            dashboard.in_stock += 1;
            dashboard.stock_value += record.total_cost();
            dashboard.aging.add(record.days_held(today));
            continue;
        };

        dashboard.sold += 1;
        let profit = record.net_profit();
        dashboard.revenue += record.selling_price;
        dashboard.realized_profit += profit;
        sold_cost += record.total_cost();

        if let Some(days) = record.days_held(today) {
            days_to_sell.push(days);
        }
        *by_month
            .entry(date_selling.format("%Y-%m").to_string())
            .or_default() += profit;

        let summary = SaleSummary {
            plate: record.plate.clone(),
            net_profit: profit,
        };
        if dashboard
            .best_sale
            .as_ref()
            .is_none_or(|best| profit > best.net_profit)
        {
            dashboard.best_sale = Some(summary.clone());
        }
        if dashboard
            .worst_sale
            .as_ref()
            .is_none_or(|worst| profit < worst.net_profit)
        {
            dashboard.worst_sale = Some(summary);
        }
    }

    dashboard.average_margin_percent = (dashboard.revenue > 0.0)
        .then(|| dashboard.realized_profit / dashboard.revenue * 100.0);
    dashboard.roi_percent = (sold_cost > 0.0).then(|| dashboard.realized_profit / sold_cost * 100.0);
    dashboard.average_days_to_sell = (!days_to_sell.is_empty())
        .then(|| days_to_sell.iter().sum::<i64>() as f64 / days_to_sell.len() as f64);
    dashboard.monthly = monthly_series(by_month, window);
    dashboard
}

fn monthly_series(by_month: BTreeMap<String, f64>, window: usize) -> Vec<MonthlyProfit> {
    let window = window.max(1);
    let profits = by_month.values().copied().collect::<Vec<_>>();

    by_month
        .into_iter()
        .enumerate()
        .map(|(index, (month, profit))| {
            let start = (index + 1).saturating_sub(window);
            let slice = &profits[start..=index];
            MonthlyProfit {
                month,
                profit,
                moving_average: slice.iter().sum::<f64>() / slice.len() as f64,
            }
        })
        .collect()
}
