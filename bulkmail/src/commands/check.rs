//! `bulkmail check`

use anyhow::Result;
use bulkmail::config::BulkmailConfig;
use bulkmail::state::BulkmailState;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✔ ", "");
static CROSS: Emoji<'_, '_> = Emoji("✘ ", "x ");

pub fn execute(config: BulkmailConfig) -> Result<()> {
    let state = BulkmailState::from_config(config);
    let loader = state.loader();
    let report = loader.load()?;

    if report.source_missing {
        println!(
            "{}{}",
            CROSS,
            style(format!("recipient source {} not found", loader.source().display())).red()
        );
        return Ok(());
    }

    println!(
        "{}{} recipients pending",
        CHECK,
        style(report.pending.len()).green().bold()
    );
    println!("  {} already sent", report.skipped_sent);
    println!("  {} duplicates in source", report.duplicates);

    if !report.invalid.is_empty() {
        println!(
            "{}{} invalid addresses",
            CROSS,
            style(report.invalid.len()).red().bold()
        );
        for (candidate, reason) in &report.invalid {
            println!("  {} {}", style(candidate).yellow(), style(reason).dim());
        }
    }

    Ok(())
}
