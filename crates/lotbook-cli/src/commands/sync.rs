use std::path::Path;

use lotbook_core::models::SyncRun;
use lotbook_core::sync::{SyncError, SyncReport};

use crate::commands::common::{format_sync_timestamp, open_ledger, sync_settings_from_profile};
use crate::error::CliError;

pub async fn run_sync(profile: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let settings = sync_settings_from_profile(profile)?;
    let ledger = open_ledger(db_path)?;

    match ledger.sync(&settings).await {
        Ok(report) => {
            println!("{}", format_sync_report(&report));
            Ok(())
        }
        Err(error @ SyncError::Conflict { .. }) => {
            tracing::warn!("Sync aborted: {error}");
            Err(error.into())
        }
        Err(error) => Err(error.into()),
    }
}

pub async fn run_sync_history(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let ledger = open_ledger(db_path)?;
    let runs = ledger.sync_runs(limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No sync runs recorded.");
        return Ok(());
    }

    for line in format_sync_run_lines(&runs) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_report(report: &SyncReport) -> String {
    format!(
        "Sync completed: {} records, {} inserted, {} updated, {}",
        report.total,
        report.inserted,
        report.updated,
        if report.pushed {
            format!(
                "pushed revision {}",
                report.version.as_deref().unwrap_or("unknown")
            )
        } else {
            "remote already up to date".to_string()
        }
    )
}

pub fn format_sync_run_lines(runs: &[SyncRun]) -> Vec<String> {
    runs.iter()
        .map(|run| {
            format!(
                "{}  {:<6}  +{} ~{} total={}  {}",
                format_sync_timestamp(run.synced_at),
                if run.pushed { "pushed" } else { "pulled" },
                run.inserted,
                run.updated,
                run.total,
                run.version.as_deref().unwrap_or("-")
            )
        })
        .collect()
}
