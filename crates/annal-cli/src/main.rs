//! annal - management command for the history store.
//!
//! # Usage
//!
//! ```bash
//! # Archive history rows older than 30 days
//! annal archive --days 30
//!
//! # Archive history rows older than 2 weeks
//! annal archive --weeks 2
//!
//! # Point at a specific database (or set ANNAL_DB_PATH)
//! annal archive --days 30 --db /var/lib/annal/history.db
//! ```
//!
//! When both `--days` and `--weeks` are supplied, a warning is logged and
//! weeks takes precedence.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use annal_core::{AnnalConfig, HistoryStore, RetentionPeriod};

const PARAM_ERROR: &str = "You must supply either the days or the weeks param";

#[derive(Parser)]
#[command(name = "annal", version, about = "Field-level history tracking and archival")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Archive historical records older than the specified days or weeks.
    ///
    /// Rows older than the cutoff are moved from the live history table to
    /// the "archived_historical_records" table in a single transaction.
    Archive {
        /// Any historical record older than this number of days gets archived.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,

        /// Any historical record older than this number of weeks gets archived.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        weeks: Option<u32>,

        /// Path to the history database (defaults to the configured path).
        #[arg(long, env = "ANNAL_DB_PATH")]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Archive { days, weeks, db } => archive(days, weeks, db),
    }
}

fn archive(days: Option<u32>, weeks: Option<u32>, db: Option<PathBuf>) -> Result<()> {
    let Some(period) = RetentionPeriod::resolve(days, weeks) else {
        eprintln!("{PARAM_ERROR}");
        return Ok(());
    };

    let db_path = db.unwrap_or_else(|| AnnalConfig::from_env().db_path);
    let store = HistoryStore::open(&db_path)?;

    let outcome = store.archive_older_than(period, Utc::now())?;
    println!("{} archived.", outcome.archived);

    Ok(())
}
