use std::path::Path;

use lotbook_core::models::Sale;

use crate::commands::common::{
    format_amount, normalize_plate_arg, open_ledger, parse_optional_date_arg, today,
};
use crate::error::CliError;

pub async fn run_sell(
    plate: &str,
    price: f64,
    date: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let plate = normalize_plate_arg(plate)?;
    let sale = Sale {
        selling_price: price,
        date_selling: parse_optional_date_arg(date)?.unwrap_or_else(today),
    };

    let ledger = open_ledger(db_path)?;
    let record = ledger.sell(&plate, &sale).await?;

    println!(
        "{}  sold for {}  net profit {}",
        record.plate,
        format_amount(record.selling_price),
        format_amount(record.net_profit())
    );
    Ok(())
}
