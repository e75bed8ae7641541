//! bulkmail CLI

#![forbid(unsafe_code)]

mod commands;

use anyhow::Result;
use bulkmail::config::BulkmailConfig;
use bulkmail::observability;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "bulkmail")]
#[command(version)]
#[command(about = "Quota-aware bulk email sender", long_about = None)]
struct Cli {
    /// Configuration file (default: ./bulkmail.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the campaign to every pending recipient (default)
    Run {
        /// Log messages instead of sending them; the ledger and quota files are left untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// Show today's quota, ledger size and pending recipients
    Status,
    /// Validate the recipient list without sending anything
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BulkmailConfig::load_from(path)?,
        None => BulkmailConfig::load()?,
    };
    observability::init(&config.logging)?;

    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "failed to read .env file");
        }
    }

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => commands::run::execute(config, dry_run).await,
        Commands::Status => commands::status::execute(config),
        Commands::Check => commands::check::execute(config),
    }
}
