//! Store maintenance commands
//!
//! Statistics, logger listing, retention cleanup and full deletion.

use anyhow::{Context, Result};
use colored::Colorize;
use logbook::store::{run_retention_now, LogLevel, LogStore};

/// Show store statistics
pub async fn show_stats(store: &LogStore) -> Result<()> {
    let stats = store.stats().await.context("Failed to read statistics")?;

    println!("{}", "Log Store Statistics".bold().underline());
    println!();
    println!("{:<30} {}", "Database:", store.path().display());
    println!("{:<30} {:>15}", "Log Entries:", format_number(stats.total_count));
    if let (Some(oldest), Some(newest)) = (stats.oldest_timestamp, stats.newest_timestamp) {
        println!("{:<30} {:>15}", "Oldest:", oldest.format("%Y-%m-%d %H:%M:%S"));
        println!("{:<30} {:>15}", "Newest:", newest.format("%Y-%m-%d %H:%M:%S"));
    }
    println!();

    println!("{}", "By Level".bold());
    for level in LogLevel::ALL.iter().rev() {
        println!(
            "{:<30} {:>15}",
            format!("  {}:", level),
            format_number(stats.level_count(*level))
        );
    }
    println!();

    if !stats.counts_by_logger.is_empty() {
        println!("{}", "By Logger".bold());
        for entry in &stats.counts_by_logger {
            println!(
                "{:<30} {:>15}",
                format!("  {}:", entry.logger_name),
                format_number(entry.count)
            );
        }
        println!();
    }

    Ok(())
}

/// List distinct logger names
pub async fn list_loggers(store: &LogStore) -> Result<()> {
    let names = store.logger_names().await?;

    if names.is_empty() {
        println!("{}", "No loggers recorded yet".yellow());
    }
    for name in names {
        println!("{}", name.cyan());
    }

    Ok(())
}

/// Run cleanup and show results
pub async fn run_cleanup(store: &LogStore, days: u32) -> Result<()> {
    println!(
        "{}",
        format!("Deleting logs older than {} days...", days).bold()
    );
    println!();

    let deleted = run_retention_now(store, days)
        .await
        .context("Cleanup failed; no records were deleted")?;

    println!("{:<30} {:>15}", "  Logs Deleted:", format_number(deleted));
    println!();

    if deleted == 0 {
        println!(
            "{}",
            "No old data to delete (all data within retention period)".dimmed()
        );
    } else {
        println!("{}", "Cleanup completed successfully!".green().bold());
    }

    Ok(())
}

/// Delete every record
pub async fn clear(store: &LogStore, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("Refusing to delete all logs without --yes");
    }

    let deleted = store
        .delete_all()
        .await
        .context("Clear failed; no records were deleted")?;

    println!(
        "{}",
        format!("Deleted {} log entries", format_number(deleted))
            .green()
            .bold()
    );
    Ok(())
}

/// Format large numbers with commas
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, ch) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }

    result.chars().rev().collect()
}
