use std::path::Path;

use lotbook_core::stats::Dashboard;

use crate::commands::common::{format_amount, format_percent, open_ledger, today};
use crate::error::CliError;

pub async fn run_stats(window: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let ledger = open_ledger(db_path)?;
    let dashboard = ledger.stats(today(), window).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        for line in format_dashboard_lines(&dashboard) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_dashboard_lines(dashboard: &Dashboard) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Vehicles:        {} total, {} sold, {} in stock",
            dashboard.total, dashboard.sold, dashboard.in_stock
        ),
        format!("Invested:        {}", format_amount(dashboard.total_invested)),
        format!("Stock value:     {}", format_amount(dashboard.stock_value)),
        format!("Revenue:         {}", format_amount(dashboard.revenue)),
        format!("Realized profit: {}", format_amount(dashboard.realized_profit)),
        format!(
            "Avg margin:      {}",
            format_percent(dashboard.average_margin_percent)
        ),
        format!("ROI:             {}", format_percent(dashboard.roi_percent)),
        format!(
            "Avg days to sell: {}",
            dashboard
                .average_days_to_sell
                .map_or_else(|| "-".to_string(), |days| format!("{days:.1}"))
        ),
    ];

    if let Some(best) = &dashboard.best_sale {
        lines.push(format!(
            "Best sale:       {} ({})",
            best.plate,
            format_amount(best.net_profit)
        ));
    }
    if let Some(worst) = &dashboard.worst_sale {
        lines.push(format!(
            "Worst sale:      {} ({})",
            worst.plate,
            format_amount(worst.net_profit)
        ));
    }

    let aging = dashboard.aging;
    lines.push(format!(
        "Stock age:       0-30d {}  31-60d {}  61-90d {}  90d+ {}  unknown {}",
        aging.up_to_30, aging.days_31_to_60, aging.days_61_to_90, aging.over_90, aging.unknown
    ));

    if !dashboard.monthly.is_empty() {
        lines.push("Monthly profit:".to_string());
        for entry in &dashboard.monthly {
            lines.push(format!(
                "  {}  {:>12}  avg {:>12}",
                entry.month,
                format_amount(entry.profit),
                format_amount(entry.moving_average)
            ));
        }
    }
    lines
}
