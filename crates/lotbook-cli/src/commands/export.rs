use std::path::{Path, PathBuf};

use chrono::Utc;
use lotbook_core::export::suggested_export_file_name;

use crate::cli::ExportFormat;
use crate::commands::common::open_ledger;
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let ledger = open_ledger(db_path)?;
    let rendered = ledger.export(format.into()).await?;

    if let Some(path) = output_path {
        let path = resolve_output_path(path, format, Utc::now().timestamp_millis());
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        print!("{rendered}");
        if !rendered.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}

/// A directory output gets a generated file name inside it.
pub fn resolve_output_path(path: &Path, format: ExportFormat, timestamp_ms: i64) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_export_file_name(format.into(), timestamp_ms))
    } else {
        path.to_path_buf()
    }
}
