//! agendaq - collector for the published agendas of Québec ministers.
//!
//! Pulls the roster and per-minister CSV exports from the transparency
//! portal, merges them into per-minister records, and renders the daily
//! summaries and calendar files served to readers.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod collect;
mod ical;
mod summarize;

/// agendaq - minister agenda collector
#[derive(Parser, Debug)]
#[command(name = "agendaq")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root directory for persisted agenda data
    #[arg(long, env = "AGENDAQ_DATA_DIR", default_value = "minister_agendas")]
    data_dir: PathBuf,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the roster and pull every minister's published agenda
    Collect {
        /// Portal page the roster and minister pages hang off
        #[arg(long, env = "AGENDAQ_BASE_URL", default_value = collect::PORTAL_URL)]
        base_url: String,

        /// Concurrent minister fetches
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Render daily summaries from persisted records
    Summarize {
        /// Trailing days to cover, ending at --end-date
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Last day of the window (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Export persisted records as iCalendar files
    Ical,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Collect {
            base_url,
            concurrency,
        } => collect::run(&cli.data_dir, &base_url, concurrency).await,
        Commands::Summarize { days, end_date } => summarize::run(&cli.data_dir, days, end_date),
        Commands::Ical => ical::run(&cli.data_dir),
    }
}
