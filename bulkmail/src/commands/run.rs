//! `bulkmail run`

use anyhow::Result;
use bulkmail::clock::SystemClock;
use bulkmail::config::{BackendKind, BulkmailConfig};
use bulkmail::dispatch::{CancellationToken, RunOutcome, RunReport};
use bulkmail::state::BulkmailState;
use bulkmail::store::{
    FileLedger, FileQuotaStore, MemoryLedger, MemoryQuotaStore, QuotaStore, SendLedger,
};
use console::style;
use std::sync::Arc;
use tracing::{error, warn};

pub async fn execute(mut config: BulkmailConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        config.backend = BackendKind::Console;
    }
    let config = config.validated()?;

    let state = if dry_run {
        dry_run_state(config)?
    } else {
        BulkmailState::from_config(config)
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let dispatcher = state.dispatcher(state.sender()?)?.with_shutdown(shutdown);
    let report = dispatcher.run().await?;

    print_summary(&report, dry_run);
    Ok(())
}

/// State whose writes stay in memory, seeded from the real files
fn dry_run_state(config: BulkmailConfig) -> Result<BulkmailState> {
    let sent = FileLedger::new(config.storage.ledger.clone()).sent_addresses()?;
    let record = FileQuotaStore::new(config.storage.quota.clone()).load()?;

    let quota = record.map_or_else(MemoryQuotaStore::new, MemoryQuotaStore::with_record);
    Ok(BulkmailState::with_stores(
        config,
        Arc::new(MemoryLedger::with_entries(sent)),
        Arc::new(quota),
        Arc::new(SystemClock),
    ))
}

fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("shutdown requested, stopping after the current batch");
        token.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn print_summary(report: &RunReport, dry_run: bool) {
    let heading = match report.outcome {
        Some(RunOutcome::NothingToSend) => style("Nothing to send").yellow().bold(),
        Some(RunOutcome::Cancelled) => style("Stopped").yellow().bold(),
        Some(RunOutcome::Drained) | None => style("Finished").green().bold(),
    };
    let mode = if dry_run { " (dry run)" } else { "" };

    println!("\n{heading}{mode}");
    println!("  {:<10} {}", style("sent").dim(), style(report.sent).green());
    println!("  {:<10} {}", style("skipped").dim(), report.skipped);
    println!("  {:<10} {}", style("failed").dim(), style(report.failed).red());
    println!("  {:<10} {}", style("errors").dim(), report.errors);
    println!("  {:<10} {}", style("batches").dim(), report.batches);
    if report.failed > 0 {
        println!(
            "\n{}",
            style("Failed addresses stay pending and will be retried on the next run.").dim()
        );
    }
}
