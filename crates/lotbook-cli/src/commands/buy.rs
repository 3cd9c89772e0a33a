use std::path::Path;

use lotbook_core::models::NewPurchase;

use crate::commands::common::{
    format_amount, normalize_plate_arg, open_ledger, parse_optional_date_arg, today,
};
use crate::error::CliError;

pub async fn run_buy(
    plate: &str,
    owner: &str,
    price: f64,
    repair: f64,
    date: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let plate = normalize_plate_arg(plate)?;
    let date_purchase = parse_optional_date_arg(date)?.unwrap_or_else(today);

    let ledger = open_ledger(db_path)?;
    let record = ledger
        .buy(NewPurchase {
            plate,
            owner: owner.to_string(),
            purchase_price: price,
            repair_cost: repair,
            date_purchase: Some(date_purchase),
        })
        .await?;

    println!(
        "{}  bought for {} on {}",
        record.plate,
        format_amount(record.total_cost()),
        date_purchase
    );
    Ok(())
}
