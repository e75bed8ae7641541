//! `bulkmail status`

use anyhow::Result;
use bulkmail::config::BulkmailConfig;
use bulkmail::state::BulkmailState;
use console::style;

pub fn execute(config: BulkmailConfig) -> Result<()> {
    let source = config.storage.recipients.clone();
    let status = BulkmailState::from_config(config).status()?;

    println!("{}", style("bulkmail status").bold().underlined());
    println!(
        "  {:<16} {} / {} on {}",
        "sent today",
        style(status.daily_count).cyan().bold(),
        status.daily_limit,
        status.today
    );
    println!("  {:<16} {}", "quota left", status.remaining_quota());
    println!("  {:<16} {}", "ledger entries", status.ledger_size);

    if status.load.source_missing {
        println!(
            "  {:<16} {}",
            "pending",
            style(format!("source {} not found", source.display())).yellow()
        );
    } else {
        println!(
            "  {:<16} {}",
            "pending",
            style(status.load.pending.len()).green().bold()
        );
    }

    Ok(())
}
