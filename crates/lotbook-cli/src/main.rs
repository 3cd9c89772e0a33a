//! lotbook CLI - purchase and sale ledger for used-vehicle resellers
//!
//! Records live in a local `SQLite` file and sync through a CSV snapshot kept
//! in a GitHub Gist.

mod cli;
mod commands;
mod config_profiles;
mod credentials;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use lotbook_core::db::RecordQuery;
use lotbook_core::models::RecordUpdate;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::buy::run_buy;
use crate::commands::common::{parse_optional_date_arg, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::{run_delete, run_restore, run_wipe};
use crate::commands::edit::run_edit;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::list::run_list;
use crate::commands::sell::run_sell;
use crate::commands::show::run_show;
use crate::commands::stats::run_stats;
use crate::commands::sync::{run_sync, run_sync_history};
use crate::commands::token::run_token;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "lotbook=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let Cli {
        command,
        db_path,
        profile,
    } = Cli::parse();
    let profile = profile.as_deref();
    let ledger_path = || resolve_db_path(db_path.clone());

    match command {
        Commands::Buy {
            plate,
            price,
            owner,
            repair,
            date,
        } => run_buy(&plate, &owner, price, repair, date.as_deref(), &ledger_path()?).await,
        Commands::Sell { plate, price, date } => {
            run_sell(&plate, price, date.as_deref(), &ledger_path()?).await
        }
        Commands::Edit {
            plate,
            owner,
            purchase_price,
            repair_cost,
            selling_price,
            date_purchase,
            date_selling,
            unsell,
        } => {
            let update = RecordUpdate {
                owner,
                purchase_price,
                repair_cost,
                selling_price,
                date_purchase: parse_optional_date_arg(date_purchase.as_deref())?,
                date_selling: parse_optional_date_arg(date_selling.as_deref())?,
                clear_sale: unsell,
            };
            run_edit(&plate, &update, &ledger_path()?).await
        }
        Commands::Show { plate, json } => run_show(&plate, json, &ledger_path()?).await,
        Commands::List {
            status,
            search,
            sort,
            limit,
            json,
        } => {
            let query = RecordQuery {
                status: status.into(),
                search,
                sort: sort.into(),
                limit: Some(limit),
                offset: 0,
            };
            run_list(&query, json, &ledger_path()?).await
        }
        Commands::Delete { plate } => run_delete(&plate, &ledger_path()?).await,
        Commands::Restore { plate } => run_restore(&plate, &ledger_path()?).await,
        Commands::Wipe { yes } => run_wipe(yes, &ledger_path()?).await,
        Commands::Stats { window, json } => run_stats(window, json, &ledger_path()?).await,
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &ledger_path()?).await
        }
        Commands::Import { path } => run_import(&path, &ledger_path()?).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Sync { command: None } => run_sync(profile, &ledger_path()?).await,
        Commands::Sync {
            command: Some(SyncCommands::History { limit, json }),
        } => run_sync_history(limit, json, &ledger_path()?).await,
        Commands::Config { command } => run_config(command, profile),
        Commands::Token { command } => run_token(command, profile),
    }
}
