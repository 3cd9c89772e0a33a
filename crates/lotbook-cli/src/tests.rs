use std::path::PathBuf;

use clap::Parser;
use lotbook_core::db::RecordQuery;
use lotbook_core::models::{RecordUpdate, SyncRun};
use lotbook_core::stats::compute_dashboard;
use lotbook_core::sync::SyncReport;
use lotbook_core::LedgerService;
use pretty_assertions::assert_eq;

use crate::cli::{Cli, Commands, CompletionShell, ExportFormat, SortOrder, StatusFilter};
use crate::commands::buy::run_buy;
use crate::commands::common::{
    format_amount, format_percent, format_record_details, format_relative_time,
    normalize_plate_arg, parse_date_arg, parse_optional_date_arg, resolve_db_path,
};
use crate::commands::completions::render_completions;
use crate::commands::delete::{run_delete, run_restore, run_wipe};
use crate::commands::edit::run_edit;
use crate::commands::export::{resolve_output_path, run_export};
use crate::commands::import::run_import;
use crate::commands::sell::run_sell;
use crate::commands::stats::format_dashboard_lines;
use crate::commands::sync::{format_sync_report, format_sync_run_lines};
use crate::error::CliError;

fn temp_db() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger").join("lotbook.db");
    (dir, path)
}

#[test]
fn normalize_plate_arg_rejects_blank() {
    assert_eq!(normalize_plate_arg(" gj01  ab ").unwrap(), "GJ01 AB");
    assert!(matches!(normalize_plate_arg("   "), Err(CliError::EmptyPlate)));
}

#[test]
fn parse_date_arg_accepts_iso_dates_only() {
    assert_eq!(parse_date_arg("2024-02-01").unwrap().to_string(), "2024-02-01");
    assert!(matches!(
        parse_date_arg("01/02/2024"),
        Err(CliError::InvalidDate(_))
    ));
    assert_eq!(parse_optional_date_arg(None).unwrap(), None);
}

#[test]
fn explicit_db_path_wins() {
    let path = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(path.clone())).unwrap(), path);
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_amount_and_percent() {
    assert_eq!(format_amount(1500.0), "1500.00");
    assert_eq!(format_amount(-12.345), "-12.35");
    assert_eq!(format_percent(Some(12.34)), "12.3%");
    assert_eq!(format_percent(None), "-");
}

#[test]
fn cli_parses_buy_with_global_flags() {
    let cli = Cli::try_parse_from([
        "lotbook",
        "--db-path",
        "/tmp/x.db",
        "buy",
        "GJ1",
        "--price",
        "10000",
        "--repair",
        "500",
    ])
    .unwrap();
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
    match cli.command {
        Commands::Buy {
            plate,
            price,
            repair,
            ..
        } => {
            assert_eq!(plate, "GJ1");
            assert_eq!(price, 10_000.0);
            assert_eq!(repair, 500.0);
        }
        _ => panic!("expected buy"),
    }
}

#[test]
fn cli_list_defaults() {
    let cli = Cli::try_parse_from(["lotbook", "list"]).unwrap();
    match cli.command {
        Commands::List {
            status,
            sort,
            limit,
            json,
            ..
        } => {
            assert_eq!(status, StatusFilter::All);
            assert_eq!(sort, SortOrder::Recent);
            assert_eq!(limit, 20);
            assert!(!json);
        }
        _ => panic!("expected list"),
    }
}

#[test]
fn cli_edit_rejects_unsell_with_sale_fields() {
    let result = Cli::try_parse_from([
        "lotbook",
        "edit",
        "GJ1",
        "--unsell",
        "--selling-price",
        "10",
    ]);
    assert!(result.is_err());
}

#[test]
fn completions_mention_binary_name() {
    for shell in [CompletionShell::Bash, CompletionShell::Zsh, CompletionShell::Fish] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("lotbook"));
    }
}

#[test]
fn format_sync_report_describes_push() {
    let report = SyncReport {
        pushed: true,
        version: Some("abc".to_string()),
        inserted: 1,
        updated: 2,
        total: 5,
        synced_at: 0,
    };
    assert_eq!(
        format_sync_report(&report),
        "Sync completed: 5 records, 1 inserted, 2 updated, pushed revision abc"
    );

    let idle = SyncReport {
        pushed: false,
        ..report
    };
    assert!(format_sync_report(&idle).ends_with("remote already up to date"));
}

#[test]
fn format_sync_run_lines_include_counts() {
    let lines = format_sync_run_lines(&[SyncRun {
        id: 1,
        synced_at: 0,
        version: None,
        pushed: false,
        inserted: 3,
        updated: 4,
        total: 9,
    }]);
    assert_eq!(
        lines,
        vec!["1970-01-01 00:00:00 UTC  pulled  +3 ~4 total=9  -".to_string()]
    );
}

#[test]
fn format_dashboard_lines_for_empty_ledger() {
    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let lines = format_dashboard_lines(&compute_dashboard(&[], today, 3));
    assert!(lines[0].contains("0 total"));
    assert!(lines.iter().all(|line| !line.starts_with("Monthly")));
}

#[tokio::test(flavor = "multi_thread")]
async fn buy_sell_edit_roundtrip_on_disk() {
    let (_dir, db_path) = temp_db();

    run_buy("gj1", "Ravi", 10_000.0, 500.0, Some("2023-12-20"), &db_path)
        .await
        .unwrap();
    run_sell("GJ1", 12_000.0, Some("2024-02-01"), &db_path)
        .await
        .unwrap();

    let ledger = LedgerService::open_path(&db_path).unwrap();
    let record = ledger.get("GJ1").await.unwrap().unwrap();
    assert_eq!(record.net_profit(), 1_500.0);
    assert!(format_record_details(&record).contains(&"Margin:         12.5%".to_string()));
    drop(ledger);

    let update = RecordUpdate {
        clear_sale: true,
        ..RecordUpdate::default()
    };
    run_edit("GJ1", &update, &db_path).await.unwrap();

    let ledger = LedgerService::open_path(&db_path).unwrap();
    let record = ledger.get("GJ1").await.unwrap().unwrap();
    assert!(!record.is_sold());
    assert!(format_record_details(&record)
        .iter()
        .any(|line| line.contains("in stock")));
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_without_fields_is_rejected() {
    let (_dir, db_path) = temp_db();
    let result = run_edit("GJ1", &RecordUpdate::default(), &db_path).await;
    assert!(matches!(result, Err(CliError::EmptyEdit)));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_restore_and_wipe() {
    let (_dir, db_path) = temp_db();
    run_buy("AA1", "", 100.0, 0.0, None, &db_path).await.unwrap();

    run_delete("aa1", &db_path).await.unwrap();
    run_restore("AA1", &db_path).await.unwrap();

    assert!(matches!(
        run_wipe(false, &db_path).await,
        Err(CliError::WipeNotConfirmed)
    ));
    run_wipe(true, &db_path).await.unwrap();

    let ledger = LedgerService::open_path(&db_path).unwrap();
    assert!(ledger.list(&RecordQuery::default()).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn import_then_export_csv() {
    let (dir, db_path) = temp_db();
    let source = dir.path().join("incoming.csv");
    std::fs::write(
        &source,
        "plate,owner,purchasePrice,repairCost,sellingPrice,netProfit,datePurchase,dateSelling,updatedAt,deleted\n\
         KA05,Asha,5000,0,0,0,2024-01-10,,2024-01-10T00:00:00.000Z,false\n",
    )
    .unwrap();

    run_import(&source, &db_path).await.unwrap();

    let output = dir.path().join("out.csv");
    run_export(ExportFormat::Csv, Some(&output), &db_path)
        .await
        .unwrap();
    let exported = std::fs::read_to_string(output).unwrap();
    assert!(exported.contains("\"KA05\""));
    assert!(exported.contains("\"Asha\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn sell_unknown_plate_fails() {
    let (_dir, db_path) = temp_db();
    let result = run_sell("NOPE", 1.0, None, &db_path).await;
    assert!(matches!(
        result,
        Err(CliError::Core(lotbook_core::Error::NotFound(_)))
    ));
}

#[test]
fn export_to_directory_uses_suggested_name() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = resolve_output_path(dir.path(), ExportFormat::Json, 42);
    assert_eq!(resolved, dir.path().join("lotbook-export-42.json"));

    let file = dir.path().join("custom.csv");
    assert_eq!(resolve_output_path(&file, ExportFormat::Csv, 42), file);
}
