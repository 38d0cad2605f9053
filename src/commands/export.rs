//! Export command

use super::logs::FilterArgs;
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use logbook::store::{ExportFormat, LogStore};
use std::path::PathBuf;

/// Export logs as CSV or JSON
#[derive(Debug, Clone, Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Export format
    #[arg(short = 'f', long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the export command
pub async fn execute(store: &LogStore, args: ExportArgs) -> Result<()> {
    let filter = args.filter.to_filter();
    let content = store
        .export(&filter, args.format)
        .await
        .context("Export failed")?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                format!("Exported logs to {}", path.display()).green()
            );
        }
        None => print!("{}", content),
    }

    Ok(())
}
