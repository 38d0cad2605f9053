//! Logs query command
//!
//! Query and display records from the log store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, ValueEnum};
use colored::Colorize;
use logbook::store::{LogFilter, LogLevel, LogRecord, LogStore, SortOrder};
use std::time::Duration;

/// Filter flags shared by query-style commands
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Filter by log level (repeatable: DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(short, long)]
    pub level: Vec<LogLevel>,

    /// Only records at or above this level
    #[arg(long)]
    pub min_level: Option<LogLevel>,

    /// Filter by logger name (repeatable, exact match)
    #[arg(long)]
    pub logger: Vec<String>,

    /// Substring of the message (case-sensitive)
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Show logs since N seconds ago (e.g., 3600 for last hour)
    #[arg(long)]
    pub since: Option<u64>,

    /// Show logs until N seconds ago
    #[arg(long)]
    pub until: Option<u64>,

    /// Maximum number of results
    #[arg(long, default_value = "100")]
    pub limit: u32,

    /// Number of matching records to skip
    #[arg(long, default_value = "0")]
    pub offset: u32,

    /// Show oldest first (default: newest first)
    #[arg(long)]
    pub oldest_first: bool,
}

impl FilterArgs {
    pub fn to_filter(&self) -> LogFilter {
        let now = Utc::now();
        // Offsets beyond the representable range clamp to the earliest date
        let seconds_ago = |secs: u64| {
            i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .and_then(|age| now.checked_sub_signed(age))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        };

        LogFilter {
            levels: self.level.clone(),
            logger_names: self.logger.clone(),
            start_time: self.since.map(seconds_ago),
            end_time: self.until.map(seconds_ago),
            search_text: self.grep.clone(),
            min_level: self.min_level,
            limit: self.limit,
            offset: self.offset,
            order: if self.oldest_first {
                SortOrder::OldestFirst
            } else {
                SortOrder::NewestFirst
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Query and display logs
#[derive(Debug, Clone, Parser)]
pub struct LogsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Follow logs in real-time (tail -f mode)
    #[arg(long, conflicts_with = "until")]
    pub follow: bool,
}

/// Execute the logs command
pub async fn execute(store: &LogStore, args: LogsArgs) -> Result<()> {
    let filter = args.filter.to_filter();

    if args.follow {
        return follow_logs(store, filter).await;
    }

    let logs = store.query(&filter).await.context("Failed to query logs")?;
    if logs.is_empty() {
        println!("{}", "No logs found matching the criteria".yellow());
        return Ok(());
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&logs)?),
        OutputFormat::Text => {
            let total = store.count(&filter).await?;
            println!(
                "{}",
                format!("Showing {} of {} log entries", logs.len(), total).bold()
            );
            println!();
            display_logs_text(&logs);
        }
    }

    Ok(())
}

/// Execute the search command
pub async fn search(store: &LogStore, text: &str, limit: u32) -> Result<()> {
    let logs = store.search(text, limit).await.context("Search failed")?;

    if logs.is_empty() {
        println!("{}", format!("No messages contain \"{}\"", text).yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} log entries", logs.len()).bold());
    println!();
    display_logs_text(&logs);
    Ok(())
}

/// Execute the show command
pub async fn show(store: &LogStore, id: i64) -> Result<()> {
    let Some(log) = store.get_by_id(id).await? else {
        anyhow::bail!("Log record {} not found", id);
    };

    println!("{:<12} {}", "ID:".bold(), log.id);
    println!("{:<12} {}", "Timestamp:".bold(), format_timestamp(&log.timestamp));
    println!("{:<12} {}", "Level:".bold(), colorize_level(log.level));
    println!("{:<12} {}", "Logger:".bold(), log.logger_name.cyan());
    if let Some(module) = &log.module {
        println!("{:<12} {}", "Module:".bold(), module);
    }
    if let Some(function) = &log.function {
        println!("{:<12} {}", "Function:".bold(), function);
    }
    if let Some(line) = log.line_number {
        println!("{:<12} {}", "Line:".bold(), line);
    }
    println!("{:<12} {}", "Message:".bold(), log.message);
    if let Some(extra) = &log.extra_data {
        println!("{}", "Extra:".bold());
        println!("{}", serde_json::to_string_pretty(extra)?);
    }
    if let Some(exception) = &log.exception {
        println!("{}", "Exception:".bold());
        println!("{}", exception.red());
    }

    Ok(())
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn colorize_level(level: LogLevel) -> colored::ColoredString {
    let name = level.as_str();
    match level {
        LogLevel::Critical => name.white().on_red().bold(),
        LogLevel::Error => name.red().bold(),
        LogLevel::Warning => name.yellow().bold(),
        LogLevel::Info => name.green(),
        LogLevel::Debug => name.blue(),
    }
}

/// Display logs in human-friendly text format
fn display_logs_text(logs: &[LogRecord]) {
    for log in logs {
        println!(
            "{} {} {} {}",
            format_timestamp(&log.timestamp).dimmed(),
            colorize_level(log.level),
            log.logger_name.cyan(),
            log.message
        );

        if let Some(extra) = &log.extra_data {
            if let Ok(fields) = serde_json::to_string(extra) {
                println!("  {}", format!("extra: {}", fields).dimmed());
            }
        }
        if let Some(exception) = &log.exception {
            for line in exception.lines() {
                println!("  {}", line.red());
            }
        }
    }
}

/// Follow logs in real-time (tail -f mode)
async fn follow_logs(store: &LogStore, filter: LogFilter) -> Result<()> {
    println!("{}", "Following logs (Ctrl+C to stop)...".bold());
    println!();

    let newest = store
        .query(&filter.clone().order(SortOrder::NewestFirst).limit(1))
        .await?;
    let mut cursor = newest
        .first()
        .map(|log| (log.timestamp, log.id))
        .unwrap_or((Utc::now(), 0));

    let mut poll_interval = tokio::time::interval(Duration::from_millis(500));

    loop {
        poll_interval.tick().await;

        // Chronological order for follow mode
        let page = filter
            .clone()
            .since(cursor.0)
            .order(SortOrder::OldestFirst)
            .offset(0);
        let logs: Vec<LogRecord> = store
            .query(&page)
            .await?
            .into_iter()
            .filter(|log| (log.timestamp, log.id) > cursor)
            .collect();

        if let Some(last) = logs.last() {
            cursor = (last.timestamp, last.id);
            display_logs_text(&logs);
        }
    }
}
