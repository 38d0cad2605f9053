//! Embedded structured log store
//!
//! A durable, queryable sink for application log records backed by a single
//! SQLite file:
//! - **Write path**: `RecordSink` (never fails), `AsyncWriter` (non-blocking,
//!   any thread), `StoreLayer` (tracing integration)
//! - **Read path**: filtered queries, search, statistics, point lookups
//! - **Export**: CSV and JSON
//! - **Maintenance**: age-based and full deletion, scheduled retention
//!
//! ## Concurrency
//!
//! ```text
//! writers ──► write gate (FIFO mutex) ──► pooled connection ──► SQLite (WAL)
//! readers ───────────────────────────────► pooled connection ──┘
//! ```
//!
//! One writer transaction at a time, many concurrent readers. All waits are
//! bounded by the pool acquire timeout and SQLite's busy timeout.

pub mod database;
pub mod export;
pub mod filter;
pub mod layer;
pub mod query;
pub mod record;
pub mod retention;
pub mod schema;
pub mod sink;
pub mod writer;

pub use database::{LogStore, StoreOptions};
pub use export::{records_to_csv, ExportFormat, CSV_HEADER};
pub use filter::{build_count_query, build_query, BuiltQuery, LogFilter, SortOrder, SqlParam};
pub use layer::StoreLayer;
pub use query::{LogStats, LoggerCount};
pub use record::{ExtraMap, ExtraValue, LogLevel, LogRecord, NewRecord};
pub use retention::{run_retention_now, spawn_retention_task, RetentionConfig};
pub use sink::{FallbackReporter, RecordSink};
pub use writer::AsyncWriter;

/// Tracing target prefix of the store's own events
pub(crate) const STORE_TARGET: &str = module_path!();
