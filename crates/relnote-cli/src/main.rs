//! relnote: operator command-line tool for the release notes store.
//!
//! Every command prints JSON to stdout. Logs go to stderr (or `LOG_FILE`).

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use uuid::Uuid;

use relnote_core::{DateFilter, MediaType, SortOrder, SyncStrategy};

#[derive(Parser, Debug)]
#[command(name = "relnote")]
#[command(author, version, about = "Manage release notes, their tags and media")]
#[command(propagate_version = true)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// How tag links are reconciled on save
    #[arg(
        long,
        env = "RELNOTE_SYNC_STRATEGY",
        global = true,
        default_value_t = SyncStrategy::Replace
    )]
    strategy: SyncStrategy,

    /// Abort a command after this many seconds
    #[arg(long, env = "RELNOTE_TIMEOUT_SECS", global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List releases, newest first unless --sort asc
    List {
        /// Only releases in this category (built-in or custom)
        #[arg(short, long)]
        category: Option<String>,

        /// Date window
        #[arg(short, long, value_enum, default_value_t = DateWindow::All)]
        date: DateWindow,

        /// Start of a custom window (RFC 3339, inclusive)
        #[arg(long, requires = "to", conflicts_with = "date")]
        from: Option<DateTime<Utc>>,

        /// End of a custom window (RFC 3339, inclusive)
        #[arg(long, requires = "from", conflicts_with = "date")]
        to: Option<DateTime<Utc>>,

        /// Sort order by release timestamp
        #[arg(short, long, value_enum, default_value_t = Sort::Desc)]
        sort: Sort,
    },

    /// Show one release
    Show {
        /// Release id
        id: Uuid,
    },

    /// Create or update a release from a JSON draft file
    Save {
        /// Draft file (`-` for stdin)
        draft: PathBuf,

        /// Write the draft back with stored ids so a rerun updates instead of creating
        #[arg(long)]
        write_back: bool,
    },

    /// Delete a release with its tag links and media
    Delete {
        /// Release id
        id: Uuid,
    },

    /// Upload a media file and print the media entry to put in a draft
    Upload {
        /// File to upload
        file: PathBuf,

        /// Media kind
        #[arg(short = 't', long = "type")]
        media_type: MediaType,

        /// Directory uploads are written to
        #[arg(long, env = "BLOB_STORAGE_PATH", default_value = "./media")]
        storage_path: PathBuf,

        /// Public URL the storage directory is served from
        #[arg(long, env = "BLOB_PUBLIC_URL", default_value = "http://localhost:8080/media")]
        public_url: String,
    },

    /// List every tag
    Tags,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DateWindow {
    All,
    Today,
    CurrentMonth,
    LastMonth,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Sort {
    Asc,
    Desc,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Asc => SortOrder::Asc,
            Sort::Desc => SortOrder::Desc,
        }
    }
}

/// Resolve the `list` date arguments to a filter.
fn date_filter(
    window: DateWindow,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> DateFilter {
    if let (Some(start), Some(end)) = (from, to) {
        return DateFilter::Custom { start, end };
    }
    match window {
        DateWindow::All => DateFilter::All,
        DateWindow::Today => DateFilter::Today,
        DateWindow::CurrentMonth => DateFilter::CurrentMonth,
        DateWindow::LastMonth => DateFilter::LastMonth,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(subsystem = "cli", error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
