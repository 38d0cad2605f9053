//! Log record data model
//!
//! `LogRecord` is the persisted, immutable row. `NewRecord` carries the raw
//! inputs of an emit call before the store assigns an id.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Severity of a log record, ordered by rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Numeric rank used for severity comparisons (10..=50)
    pub fn rank(self) -> i64 {
        match self {
            Self::Debug => 10,
            Self::Info => 20,
            Self::Warning => 30,
            Self::Error => 40,
            Self::Critical => 50,
        }
    }

    /// Map a numeric rank back to a level. Unknown ranks map to INFO.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            10 => Self::Debug,
            20 => Self::Info,
            30 => Self::Warning,
            40 => Self::Error,
            50 => Self::Critical,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}' (expected DEBUG, INFO, WARNING, ERROR or CRITICAL)")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" | "FATAL" => Ok(Self::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, ParseLevelError> {
        value.parse()
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::INFO => Self::Info,
            tracing::Level::DEBUG | tracing::Level::TRACE => Self::Debug,
        }
    }
}

/// Caller-supplied extra data
pub type ExtraMap = BTreeMap<String, ExtraValue>;

/// Value of an extra field.
///
/// Anything outside this union (arrays, non-finite floats, arbitrary
/// `Debug` values) is stored as its textual representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Map(ExtraMap),
}

impl ExtraValue {
    /// Coerce values JSON cannot represent into text
    pub fn normalize(self) -> Self {
        match self {
            Self::Float(f) if !f.is_finite() => Self::Text(f.to_string()),
            Self::Map(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, value.normalize()))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ExtraValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ExtraValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for ExtraValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(value.to_string()))
    }
}

impl From<f64> for ExtraValue {
    fn from(value: f64) -> Self {
        Self::Float(value).normalize()
    }
}

impl From<ExtraMap> for ExtraValue {
    fn from(value: ExtraMap) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for ExtraValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n
                    .as_f64()
                    .map(Self::from)
                    .unwrap_or_else(|| Self::Text(n.to_string())),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(_) => Self::Text(value.to_string()),
            serde_json::Value::Object(obj) => Self::Map(
                obj.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Extra keys that mirror mandatory record fields and are never stored as extra data
pub const RESERVED_EXTRA_KEYS: [&str; 4] = ["timestamp", "level", "logger_name", "message"];

/// A persisted log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger_name: String,
    pub message: String,
    pub module: Option<String>,
    pub function: Option<String>,
    pub line_number: Option<u32>,
    pub exception: Option<String>,
    pub extra_data: Option<ExtraMap>,
}

/// Inputs of a single emit call
///
/// # Example
///
/// ```
/// use logbook::store::{LogLevel, NewRecord};
///
/// let record = NewRecord::new(LogLevel::Info, "ingest.pdf", "Parsed document")
///     .module("ingest")
///     .extra("pages", 12)
///     .extra("filename", "report.pdf");
/// assert_eq!(record.extra.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub level: LogLevel,
    pub logger_name: String,
    pub message: String,
    /// Assigned at emit time when absent
    pub timestamp: Option<DateTime<Utc>>,
    pub module: Option<String>,
    pub function: Option<String>,
    pub line_number: Option<u32>,
    pub exception: Option<String>,
    pub extra: ExtraMap,
}

impl NewRecord {
    pub fn new(level: LogLevel, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            logger_name: logger_name.into(),
            message: message.into(),
            timestamp: None,
            module: None,
            function: None,
            line_number: None,
            exception: None,
            extra: ExtraMap::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn line(mut self, line_number: u32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn exception(mut self, trace: impl Into<String>) -> Self {
        self.exception = Some(trace.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Logger name as stored; the unnamed logger is `root`
    pub fn stored_logger_name(&self) -> &str {
        let name = self.logger_name.trim();
        if name.is_empty() {
            "root"
        } else {
            name
        }
    }

    /// Serialize extra data for storage, or `None` when nothing remains
    /// after dropping reserved and private (`_`-prefixed) keys
    pub fn extra_json(&self) -> Result<Option<String>, serde_json::Error> {
        let extra: ExtraMap = self
            .extra
            .iter()
            .filter(|(key, _)| !key.starts_with('_') && !RESERVED_EXTRA_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone().normalize()))
            .collect();

        if extra.is_empty() {
            return Ok(None);
        }
        serde_json::to_string(&extra).map(Some)
    }
}

/// Storage form of a timestamp: RFC 3339, UTC, microseconds, fixed width
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Naive values (no offset) are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
