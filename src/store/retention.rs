//! Retention and deletion
//!
//! Deletions are destructive and irreversible. Each runs in one transaction
//! under the write gate: it either commits entirely or rolls back.

use super::database::LogStore;
use super::record::format_timestamp;
use crate::config::StoreConfig;
use crate::error::Result;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

impl LogStore {
    /// Delete records strictly older than `now - days`; returns the number removed
    ///
    /// `days = 0` removes everything emitted before this call. A period
    /// reaching past the earliest representable date removes nothing.
    pub async fn delete_older_than(&self, days: u32) -> Result<u64> {
        let cutoff = chrono::Duration::try_days(i64::from(days))
            .and_then(|age| Utc::now().checked_sub_signed(age));

        match cutoff {
            Some(cutoff) => self.delete_before(cutoff).await,
            None => {
                tracing::info!(days, "Retention period predates every record; nothing deleted");
                Ok(0)
            }
        }
    }

    /// Delete records with a timestamp strictly before `cutoff`
    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let _gate = self.write_gate().await;
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("DELETE FROM logs WHERE timestamp < ?")
            .bind(format_timestamp(&cutoff))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            cutoff = %format_timestamp(&cutoff),
            deleted = result.rows_affected(),
            "Deleted old log records"
        );
        Ok(result.rows_affected())
    }

    /// Delete every record; returns how many there were
    pub async fn delete_all(&self) -> Result<u64> {
        let _gate = self.write_gate().await;
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("DELETE FROM logs").execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::info!(deleted = result.rows_affected(), "Deleted all log records");
        Ok(result.rows_affected())
    }
}

/// Retention task configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Records older than this many days are deleted
    pub retention_days: u32,

    /// Hour of day (UTC, 0-23) to run; `None` runs on every check
    pub cleanup_hour: Option<u32>,

    /// Check interval (how often to check if it's cleanup time)
    pub check_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            cleanup_hour: Some(3),
            check_interval: Duration::from_secs(3600),
        }
    }
}

impl From<&StoreConfig> for RetentionConfig {
    fn from(cfg: &StoreConfig) -> Self {
        Self {
            retention_days: cfg.retention_days,
            cleanup_hour: Some(cfg.cleanup_hour),
            ..Self::default()
        }
    }
}

/// Spawn background retention task
///
/// # Example
///
/// ```ignore
/// let handle = spawn_retention_task(store.clone(), RetentionConfig::from(&cfg.store));
/// ```
pub fn spawn_retention_task(
    store: Arc<LogStore>,
    config: RetentionConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        retention_loop(store, config).await;
    })
}

async fn retention_loop(store: Arc<LogStore>, config: RetentionConfig) {
    let mut interval = time::interval(config.check_interval);
    let mut last_cleanup_day: Option<u32> = None;

    loop {
        interval.tick().await;

        let now = Utc::now();
        let due = match config.cleanup_hour {
            Some(hour) => now.hour() == hour && Some(now.ordinal()) != last_cleanup_day,
            None => true,
        };
        if !due {
            continue;
        }

        match run_retention_now(&store, config.retention_days).await {
            Ok(_) => last_cleanup_day = Some(now.ordinal()),
            Err(e) => {
                tracing::error!(error = %e, "Scheduled log retention failed");
            }
        }
    }
}

/// Apply retention immediately; vacuums when anything was removed
pub async fn run_retention_now(store: &LogStore, retention_days: u32) -> Result<u64> {
    let deleted = store.delete_older_than(retention_days).await?;

    if deleted > 0 {
        if let Err(e) = store.vacuum().await {
            tracing::warn!(error = %e, "VACUUM after retention failed");
        }
    }

    tracing::info!(retention_days, deleted, "Log retention completed");
    Ok(deleted)
}
