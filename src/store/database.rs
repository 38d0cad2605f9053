//! SQLite access for the log store
//!
//! - One pool, one connection per operation
//! - WAL mode so readers never wait on the writer
//! - A process-wide write gate: inserts and deletions are serialized in
//!   FIFO order by a fair async mutex, never by SQLite's own lock retries

use super::filter::RECORD_COLUMNS;
use super::record::{format_timestamp, parse_timestamp, ExtraMap, LogLevel, LogRecord, NewRecord};
use super::schema;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

const INSERT_LOG_SQL: &str = "INSERT INTO logs (
        timestamp, level, level_rank, logger_name, message,
        module, function, line_number, exception, extra_data
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Connection settings for a log store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Database file; parent directories are created on open
    pub database_path: PathBuf,

    /// Upper bound on waiting for SQLite file locks
    pub busy_timeout: Duration,

    /// Upper bound on waiting for a pooled connection
    pub acquire_timeout: Duration,

    pub max_connections: u32,
}

impl StoreOptions {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            max_connections: 4,
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(cfg: &StoreConfig) -> Self {
        let timeout = Duration::from_millis(cfg.busy_timeout_ms);
        Self {
            database_path: cfg.database_path.clone(),
            busy_timeout: timeout,
            acquire_timeout: timeout,
            max_connections: cfg.max_connections,
        }
    }
}

/// Log store handle
///
/// Owned by the host and shared as `Arc<LogStore>`; there is no global
/// instance.
pub struct LogStore {
    pool: SqlitePool,
    write_gate: Mutex<()>,
    path: PathBuf,
}

impl LogStore {
    /// Open (creating if missing) the store and ensure its schema
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = LogStore::open(&StoreOptions::new("./data/logs.db")).await?;
    /// ```
    pub async fn open(options: &StoreOptions) -> Result<Self> {
        if let Some(parent) = options.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&options.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(StoreError::Unavailable)?;

        schema::ensure_schema(&pool).await?;

        tracing::info!(
            path = %options.database_path.display(),
            max_connections = options.max_connections,
            "Log store opened"
        );

        Ok(Self {
            pool,
            write_gate: Mutex::new(()),
            path: options.database_path.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the underlying connection pool (for advanced usage)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for exclusive write access
    pub(crate) async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Persist one record as a single atomic insert; returns its id
    pub(crate) async fn insert(&self, record: &NewRecord, timestamp: DateTime<Utc>) -> Result<i64> {
        let timestamp = format_timestamp(&timestamp);
        let extra_data = record.extra_json()?;

        let _gate = self.write_gate().await;
        let result = sqlx::query(INSERT_LOG_SQL)
            .bind(timestamp)
            .bind(record.level.as_str())
            .bind(record.level.rank())
            .bind(record.stored_logger_name())
            .bind(&record.message)
            .bind(&record.module)
            .bind(&record.function)
            .bind(record.line_number.map(i64::from))
            .bind(&record.exception)
            .bind(extra_data)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Point lookup; `Ok(None)` when the id is unknown
    pub async fn get_by_id(&self, id: i64) -> Result<Option<LogRecord>> {
        let row = sqlx::query(&format!("SELECT {RECORD_COLUMNS} FROM logs WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(hydrate).transpose()
    }

    /// Reclaim free pages after large deletions
    pub async fn vacuum(&self) -> Result<()> {
        let _gate = self.write_gate().await;
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Convert a `logs` row into a record
pub(crate) fn hydrate(row: &SqliteRow) -> Result<LogRecord> {
    let id: i64 = row.try_get("id")?;

    let raw_timestamp: String = row.try_get("timestamp")?;
    let timestamp = parse_timestamp(&raw_timestamp).ok_or_else(|| StoreError::CorruptRecord {
        id,
        reason: format!("unparseable timestamp '{raw_timestamp}'"),
    })?;

    let level_name: String = row.try_get("level")?;
    let level = match level_name.parse::<LogLevel>() {
        Ok(level) => level,
        Err(_) => LogLevel::from_rank(row.try_get("level_rank")?),
    };

    let extra_data = row
        .try_get::<Option<String>, _>("extra_data")?
        .and_then(|raw| match serde_json::from_str::<ExtraMap>(&raw) {
            Ok(extra) => Some(extra),
            Err(e) => {
                tracing::warn!(id, error = %e, "Ignoring malformed extra_data");
                None
            }
        });

    Ok(LogRecord {
        id,
        timestamp,
        level,
        logger_name: row.try_get("logger_name")?,
        message: row.try_get("message")?,
        module: row.try_get("module")?,
        function: row.try_get("function")?,
        line_number: row
            .try_get::<Option<i64>, _>("line_number")?
            .and_then(|line| u32::try_from(line).ok()),
        exception: row.try_get("exception")?,
        extra_data,
    })
}
