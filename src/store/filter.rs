//! Log filters and the SQL they compile to
//!
//! Every predicate value travels as a bound parameter; the query text only
//! ever contains column names, operators and `?` placeholders.

use super::record::{format_timestamp, LogLevel};
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size for log queries
pub const DEFAULT_LIMIT: u32 = 100;

pub(crate) const RECORD_COLUMNS: &str = "id, timestamp, level, level_rank, logger_name, message, \
     module, function, line_number, exception, extra_data";

/// Sort direction on timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::NewestFirst => "DESC",
            Self::OldestFirst => "ASC",
        }
    }
}

/// Filter for log queries
///
/// Predicates combine with AND; an empty set or `None` means "no predicate".
///
/// # Example
///
/// ```
/// use logbook::store::{LogFilter, LogLevel};
///
/// let filter = LogFilter::new()
///     .levels([LogLevel::Error, LogLevel::Critical])
///     .search("timeout")
///     .limit(50);
/// assert_eq!(filter.limit, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    /// Level membership
    pub levels: Vec<LogLevel>,

    /// Logger name membership (exact names)
    pub logger_names: Vec<String>,

    /// Inclusive lower time bound
    pub start_time: Option<DateTime<Utc>>,

    /// Inclusive upper time bound
    pub end_time: Option<DateTime<Utc>>,

    /// Case-sensitive substring of the message
    pub search_text: Option<String>,

    /// Minimum severity (rank comparison)
    pub min_level: Option<LogLevel>,

    pub limit: u32,
    pub offset: u32,
    pub order: SortOrder,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            logger_names: Vec::new(),
            start_time: None,
            end_time: None,
            search_text: None,
            min_level: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            order: SortOrder::NewestFirst,
        }
    }
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(mut self, levels: impl IntoIterator<Item = LogLevel>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    pub fn loggers<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.logger_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn oldest_first(self) -> Self {
        self.order(SortOrder::OldestFirst)
    }

    /// Reject combinations that cannot match anything sensible
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(StoreError::InvalidFilter(format!(
                    "start time {} is after end time {}",
                    format_timestamp(&start),
                    format_timestamp(&end)
                )));
            }
        }
        Ok(())
    }

    fn search_term(&self) -> Option<&str> {
        self.search_text.as_deref().filter(|text| !text.is_empty())
    }
}

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

/// Query text plus its parameters, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl BuiltQuery {
    /// Bind all parameters onto a sqlx query
    pub(crate) fn bind_all<'q>(
        &'q self,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| match param {
                SqlParam::Text(text) => query.bind(text.as_str()),
                SqlParam::Int(value) => query.bind(*value),
            })
    }
}

/// WHERE clause (empty when unconditioned) and its parameters
fn where_clause(filter: &LogFilter) -> (String, Vec<SqlParam>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut params = Vec::new();

    if !filter.levels.is_empty() {
        conditions.push(format!("level IN ({})", placeholders(filter.levels.len())));
        params.extend(
            filter
                .levels
                .iter()
                .map(|level| SqlParam::Text(level.as_str().to_string())),
        );
    }

    if !filter.logger_names.is_empty() {
        conditions.push(format!(
            "logger_name IN ({})",
            placeholders(filter.logger_names.len())
        ));
        params.extend(filter.logger_names.iter().cloned().map(SqlParam::Text));
    }

    if let Some(start) = &filter.start_time {
        conditions.push("timestamp >= ?".to_string());
        params.push(SqlParam::Text(format_timestamp(start)));
    }

    if let Some(end) = &filter.end_time {
        conditions.push("timestamp <= ?".to_string());
        params.push(SqlParam::Text(format_timestamp(end)));
    }

    // instr() is case-sensitive and has no wildcard characters to escape
    if let Some(text) = filter.search_term() {
        conditions.push("instr(message, ?) > 0".to_string());
        params.push(SqlParam::Text(text.to_string()));
    }

    if let Some(min_level) = filter.min_level {
        conditions.push("level_rank >= ?".to_string());
        params.push(SqlParam::Int(min_level.rank()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    (clause, params)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Build the paginated, ordered SELECT for a filter
pub fn build_query(filter: &LogFilter) -> Result<BuiltQuery> {
    filter.validate()?;

    let (clause, mut params) = where_clause(filter);
    let direction = filter.order.sql();

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM logs{clause} \
         ORDER BY timestamp {direction}, id {direction} LIMIT ? OFFSET ?"
    );
    params.push(SqlParam::Int(i64::from(filter.limit)));
    params.push(SqlParam::Int(i64::from(filter.offset)));

    Ok(BuiltQuery { sql, params })
}

/// Build a COUNT over the filter's predicates, ignoring pagination and order
pub fn build_count_query(filter: &LogFilter) -> Result<BuiltQuery> {
    filter.validate()?;

    let (clause, params) = where_clause(filter);
    Ok(BuiltQuery {
        sql: format!("SELECT COUNT(*) FROM logs{clause}"),
        params,
    })
}
