//! Record sink: the write path
//!
//! `emit` never returns an error and never panics on storage failure. A
//! failing log call must not take its host down, so every failure is
//! handed to a fallback reporter and dropped.

use super::database::LogStore;
use super::record::{LogLevel, NewRecord};
use crate::error::{Result, StoreError};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// Last-resort reporter for records that could not be persisted
pub type FallbackReporter = Arc<dyn Fn(&StoreError, &NewRecord) + Send + Sync>;

/// Accepts log records from any task and persists them
#[derive(Clone)]
pub struct RecordSink {
    store: Arc<LogStore>,
    min_level: LogLevel,
    fallback: FallbackReporter,
}

impl fmt::Debug for RecordSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSink")
            .field("path", &self.store.path())
            .field("min_level", &self.min_level)
            .finish()
    }
}

impl RecordSink {
    pub fn new(store: Arc<LogStore>, min_level: LogLevel) -> Self {
        Self {
            store,
            min_level,
            fallback: Arc::new(report_to_stderr),
        }
    }

    /// Replace the fallback reporter
    pub fn with_fallback(mut self, fallback: FallbackReporter) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    /// Persist a record, absorbing any failure
    pub async fn emit(&self, record: NewRecord) {
        if let Err(e) = self.try_emit_ref(&record).await {
            (self.fallback)(&e, &record);
        }
    }

    /// Persist a record and return its id, or `None` when the record is
    /// below the sink's minimum level
    pub async fn try_emit(&self, record: NewRecord) -> Result<Option<i64>> {
        self.try_emit_ref(&record).await
    }

    async fn try_emit_ref(&self, record: &NewRecord) -> Result<Option<i64>> {
        if record.level < self.min_level {
            return Ok(None);
        }

        let timestamp = record.timestamp.unwrap_or_else(Utc::now);
        self.store.insert(record, timestamp).await.map(Some)
    }
}

fn report_to_stderr(error: &StoreError, record: &NewRecord) {
    eprintln!(
        "logbook: failed to persist {} record from '{}': {}",
        record.level, record.logger_name, error
    );
}
