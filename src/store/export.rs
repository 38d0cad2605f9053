//! CSV and JSON export
//!
//! Exports run the regular query first, so the filter's pagination applies:
//! pass a large `limit` for a full dump.

use super::database::LogStore;
use super::filter::LogFilter;
use super::record::{format_timestamp, LogRecord};
use crate::error::Result;
use std::borrow::Cow;

/// Fixed CSV header. Extra data is not exported to CSV.
pub const CSV_HEADER: [&str; 9] = [
    "ID",
    "Timestamp",
    "Level",
    "Logger",
    "Message",
    "Module",
    "Function",
    "Line",
    "Exception",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl LogStore {
    /// Export matching records as CSV, in query order
    pub async fn export_csv(&self, filter: &LogFilter) -> Result<String> {
        let records = self.query(filter).await?;
        Ok(records_to_csv(&records))
    }

    /// Export matching records as an indented JSON array
    pub async fn export_json(&self, filter: &LogFilter) -> Result<String> {
        let records = self.query(filter).await?;
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub async fn export(&self, filter: &LogFilter, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => self.export_csv(filter).await,
            ExportFormat::Json => self.export_json(filter).await,
        }
    }
}

/// Render records as CSV with CRLF line endings
pub fn records_to_csv(records: &[LogRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| Cow::Borrowed(*h)));

    for record in records {
        let line = record.line_number.map(|l| l.to_string()).unwrap_or_default();
        push_row(
            &mut out,
            [
                Cow::Owned(record.id.to_string()),
                Cow::Owned(format_timestamp(&record.timestamp)),
                Cow::Borrowed(record.level.as_str()),
                Cow::Borrowed(record.logger_name.as_str()),
                Cow::Borrowed(record.message.as_str()),
                Cow::Borrowed(record.module.as_deref().unwrap_or("")),
                Cow::Borrowed(record.function.as_deref().unwrap_or("")),
                Cow::Owned(line),
                Cow::Borrowed(record.exception.as_deref().unwrap_or("")),
            ],
        );
    }

    out
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = Cow<'a, str>>) {
    let escaped: Vec<Cow<'_, str>> = fields.into_iter().map(csv_escape).collect();
    out.push_str(&escaped.join(","));
    out.push_str("\r\n");
}

/// Quote if contains comma, quote or line break
fn csv_escape(value: Cow<'_, str>) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        value
    }
}
