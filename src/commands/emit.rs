//! Emit command: write a single record from the command line

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use logbook::store::{ExtraValue, LogLevel, LogStore, NewRecord, RecordSink};
use std::sync::Arc;

/// Write a single record
#[derive(Debug, Clone, Parser)]
pub struct EmitArgs {
    /// Severity
    #[arg(short, long, default_value = "INFO")]
    pub level: LogLevel,

    /// Logger name (dotted path)
    #[arg(long, default_value = "root")]
    pub logger: String,

    /// Message text
    #[arg(short, long)]
    pub message: String,

    /// Originating module
    #[arg(long)]
    pub module: Option<String>,

    /// Extra field as key=value (repeatable)
    #[arg(short, long, value_parser = parse_extra)]
    pub extra: Vec<(String, ExtraValue)>,
}

/// Execute the emit command
pub async fn execute(store: Arc<LogStore>, min_level: LogLevel, args: EmitArgs) -> Result<()> {
    let mut record = NewRecord::new(args.level, args.logger, args.message);
    record.module = args.module;
    record.extra = args.extra.into_iter().collect();

    let sink = RecordSink::new(store, min_level);
    match sink.try_emit(record).await.context("Failed to write record")? {
        Some(id) => println!("{}", format!("Stored record {}", id).green()),
        None => println!(
            "{}",
            format!("Not stored: below minimum level {}", min_level).yellow()
        ),
    }

    Ok(())
}

/// Parse `key=value`, typing the value as bool, integer, float or text
fn parse_extra(raw: &str) -> Result<(String, ExtraValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }

    let value = if let Ok(b) = value.parse::<bool>() {
        ExtraValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        ExtraValue::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        ExtraValue::from(f)
    } else {
        ExtraValue::from(value)
    };

    Ok((key.to_string(), value))
}
