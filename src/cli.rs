use crate::commands::{emit::EmitArgs, export::ExportArgs, logs::LogsArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logbook", version, about = "Embedded structured log store")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "logbook.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Query stored logs
    Logs(LogsArgs),

    /// Search log messages for a substring (case-sensitive)
    Search {
        /// Text to look for
        text: String,

        /// Maximum number of results
        #[arg(long, default_value = "100")]
        limit: u32,
    },

    /// Show a single record by id
    Show {
        id: i64,
    },

    /// Show store statistics
    Stats,

    /// List distinct logger names
    Loggers,

    /// Export logs as CSV or JSON
    Export(ExportArgs),

    /// Delete records older than the retention period
    Cleanup {
        /// Retention in days (defaults to store.retention_days)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Delete every record
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Write a single record
    Emit(EmitArgs),

    /// Show version information
    Version,
}
