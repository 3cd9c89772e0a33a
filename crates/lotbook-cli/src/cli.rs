use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lotbook_core::db::{RecordSort, RecordStatus};
use lotbook_core::stats::DEFAULT_TREND_WINDOW;

#[derive(Parser)]
#[command(name = "lotbook")]
#[command(about = "Track used-vehicle purchases and sales, synced through a GitHub Gist")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a vehicle purchase
    #[command(alias = "add")]
    Buy {
        /// Registration plate
        plate: String,
        /// Purchase price
        #[arg(long, value_name = "AMOUNT")]
        price: f64,
        /// Owner / seller name
        #[arg(long, default_value = "")]
        owner: String,
        /// Repair cost so far
        #[arg(long, value_name = "AMOUNT", default_value_t = 0.0)]
        repair: f64,
        /// Purchase date (YYYY-MM-DD, defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// Mark a vehicle as sold
    Sell {
        /// Registration plate
        plate: String,
        /// Selling price
        #[arg(long, value_name = "AMOUNT")]
        price: f64,
        /// Selling date (YYYY-MM-DD, defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// Edit fields of an existing record
    Edit {
        /// Registration plate
        plate: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, value_name = "AMOUNT")]
        purchase_price: Option<f64>,
        #[arg(long, value_name = "AMOUNT")]
        repair_cost: Option<f64>,
        #[arg(long, value_name = "AMOUNT")]
        selling_price: Option<f64>,
        #[arg(long, value_name = "DATE")]
        date_purchase: Option<String>,
        #[arg(long, value_name = "DATE")]
        date_selling: Option<String>,
        /// Put the vehicle back in stock
        #[arg(long, conflicts_with_all = ["selling_price", "date_selling"])]
        unsell: bool,
    },
    /// Show one record
    Show {
        /// Registration plate
        plate: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List records
    List {
        /// Which records to include
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Match plate or owner
        #[arg(short, long)]
        search: Option<String>,
        /// Sort order
        #[arg(long, value_enum, default_value_t = SortOrder::Recent)]
        sort: SortOrder,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Soft-delete a record
    Delete {
        /// Registration plate
        plate: String,
    },
    /// Restore a soft-deleted record
    Restore {
        /// Registration plate
        plate: String,
    },
    /// Permanently remove every local record
    Wipe {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Show dashboard figures
    Stats {
        /// Moving-average window in months
        #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export records
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Merge a CSV file into the local records
    Import {
        /// CSV file in the snapshot layout
        path: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Reconcile local records with the configured gist
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Configure CLI sync profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the gist access token in the OS keychain
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    All,
    Sold,
    Unsold,
    Deleted,
}

impl From<StatusFilter> for RecordStatus {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::All => Self::All,
            StatusFilter::Sold => Self::Sold,
            StatusFilter::Unsold => Self::Unsold,
            StatusFilter::Deleted => Self::Deleted,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortOrder {
    Recent,
    Plate,
    Purchased,
    Profit,
}

impl From<SortOrder> for RecordSort {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Recent => Self::Recent,
            SortOrder::Plate => Self::Plate,
            SortOrder::Purchased => Self::Purchased,
            SortOrder::Profit => Self::Profit,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl From<ExportFormat> for lotbook_core::export::ExportFormat {
    fn from(value: ExportFormat) -> Self {
        match value {
            ExportFormat::Csv => Self::Csv,
            ExportFormat::Json => Self::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recent sync cycles
    History {
        /// Number of cycles to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Gist id holding the snapshot
        #[arg(long, value_name = "ID")]
        gist_id: Option<String>,
        /// Snapshot file name inside the gist
        #[arg(long, value_name = "NAME")]
        filename: Option<String>,
        /// GitHub REST API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Store a GitHub token with `gist` scope
    Set {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Token value (read from stdin when omitted)
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
    /// Show whether a token is available
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Remove the stored token
    Clear {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
