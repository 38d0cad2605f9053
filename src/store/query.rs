//! Query API for the log store
//!
//! Filtered retrieval, search, distinct loggers and aggregate statistics.
//! Readers take no lock: each call borrows a pooled connection and sees
//! whatever was committed when its statement ran.

use super::database::{hydrate, LogStore};
use super::filter::{build_count_query, build_query, LogFilter};
use super::record::{parse_timestamp, LogLevel, LogRecord};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::collections::BTreeMap;

/// Per-logger record count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerCount {
    pub logger_name: String,
    pub count: u64,
}

/// Aggregate statistics over the whole store
///
/// Each field comes from its own statement. Under concurrent writes the
/// fields may reflect slightly different moments (e.g. `total_count` can
/// lag the per-level sum by records committed in between); nothing here is
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total_count: u64,
    pub counts_by_level: BTreeMap<LogLevel, u64>,
    /// Descending by count, ties by name
    pub counts_by_logger: Vec<LoggerCount>,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
}

impl LogStats {
    pub fn level_count(&self, level: LogLevel) -> u64 {
        self.counts_by_level.get(&level).copied().unwrap_or(0)
    }
}

impl LogStore {
    /// Query logs with flexible filtering
    ///
    /// Returns an empty vector when nothing matches; errors mean the query
    /// could not run.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let filter = LogFilter::new()
    ///     .levels([LogLevel::Error])
    ///     .since(Utc::now() - chrono::Duration::hours(1));
    /// let logs = store.query(&filter).await?;
    /// ```
    pub async fn query(&self, filter: &LogFilter) -> Result<Vec<LogRecord>> {
        let built = build_query(filter)?;
        let rows = built.bind_all().fetch_all(self.pool()).await?;

        rows.iter().map(hydrate).collect()
    }

    /// Number of records matching the filter's predicates, ignoring pagination
    pub async fn count(&self, filter: &LogFilter) -> Result<u64> {
        let built = build_count_query(filter)?;
        let count: i64 = built.bind_all().fetch_one(self.pool()).await?.try_get(0)?;
        Ok(count as u64)
    }

    /// Newest records whose message contains `text` (case-sensitive)
    pub async fn search(&self, text: &str, limit: u32) -> Result<Vec<LogRecord>> {
        self.query(&LogFilter::new().search(text).limit(limit)).await
    }

    /// Alphabetically sorted distinct logger names
    pub async fn logger_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT logger_name FROM logs ORDER BY logger_name")
                .fetch_all(self.pool())
                .await?;
        Ok(names)
    }

    /// Get store statistics
    pub async fn stats(&self) -> Result<LogStats> {
        let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logs")
            .fetch_one(self.pool())
            .await?;

        let level_rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT level_rank, COUNT(*) FROM logs GROUP BY level_rank",
        )
        .fetch_all(self.pool())
        .await?;
        let mut counts_by_level = BTreeMap::new();
        for (rank, count) in level_rows {
            *counts_by_level.entry(LogLevel::from_rank(rank)).or_insert(0) += count as u64;
        }

        let logger_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT logger_name, COUNT(*) AS count FROM logs \
             GROUP BY logger_name ORDER BY count DESC, logger_name ASC",
        )
        .fetch_all(self.pool())
        .await?;
        let counts_by_logger = logger_rows
            .into_iter()
            .map(|(logger_name, count)| LoggerCount {
                logger_name,
                count: count as u64,
            })
            .collect();

        let (oldest, newest): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT MIN(timestamp), MAX(timestamp) FROM logs")
                .fetch_one(self.pool())
                .await?;

        Ok(LogStats {
            total_count: total_count as u64,
            counts_by_level,
            counts_by_logger,
            oldest_timestamp: oldest.as_deref().and_then(parse_timestamp),
            newest_timestamp: newest.as_deref().and_then(parse_timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::database::StoreOptions;
    use crate::store::record::NewRecord;
    use chrono::TimeZone;
    use std::sync::Arc;

    async fn create_test_store() -> (tempfile::TempDir, Arc<LogStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(&StoreOptions::new(dir.path().join("logs.db")))
            .await
            .unwrap();
        (dir, Arc::new(store))
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap()
    }

    async fn seed(store: &LogStore) {
        let records = [
            (0, LogLevel::Debug, "rag.parser", "Debug message"),
            (1, LogLevel::Info, "rag.server", "Info message"),
            (2, LogLevel::Warning, "rag.server", "Warning message"),
            (3, LogLevel::Error, "rag.server", "Error message"),
            (4, LogLevel::Critical, "rag.engine", "Critical: out of memory"),
        ];
        for (minute, level, logger, message) in records {
            store
                .insert(&NewRecord::new(level, logger, message), at(minute))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_query_logs_with_filter() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let logs = store
            .query(&LogFilter::new().levels([LogLevel::Error]))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn test_query_default_is_newest_first() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let logs = store.query(&LogFilter::default()).await.unwrap();
        let minutes: Vec<DateTime<Utc>> = logs.iter().map(|l| l.timestamp).collect();
        assert_eq!(minutes, vec![at(4), at(3), at(2), at(1), at(0)]);
    }

    #[tokio::test]
    async fn test_query_time_bounds_are_inclusive() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let logs = store
            .query(&LogFilter::new().since(at(1)).until(at(3)).oldest_first())
            .await
            .unwrap();
        let messages: Vec<&str> = logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["Info message", "Warning message", "Error message"]);
    }

    #[tokio::test]
    async fn test_query_min_level_and_pagination() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let filter = LogFilter::new().min_level(LogLevel::Warning).limit(2);
        let first = store.query(&filter).await.unwrap();
        let second = store.query(&filter.clone().offset(2)).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].level, LogLevel::Critical);
        assert_eq!(first[1].level, LogLevel::Error);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].level, LogLevel::Warning);
        assert_eq!(store.count(&filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_is_case_sensitive() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let upper = store.search("Warning", 100).await.unwrap();
        let lower = store.search("warning", 100).await.unwrap();

        assert_eq!(upper.len(), 1);
        assert!(lower.is_empty());
    }

    #[tokio::test]
    async fn test_search_treats_like_wildcards_literally() {
        let (_dir, store) = create_test_store().await;
        store
            .insert(&NewRecord::new(LogLevel::Info, "app", "100% done"), at(0))
            .await
            .unwrap();
        store
            .insert(&NewRecord::new(LogLevel::Info, "app", "1000 done"), at(1))
            .await
            .unwrap();

        let logs = store.search("0%", 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "100% done");
        assert_eq!(store.search("_", 10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_logger_names_sorted_unique() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        assert_eq!(
            store.logger_names().await.unwrap(),
            vec!["rag.engine", "rag.parser", "rag.server"]
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let stats = store.stats().await.unwrap();

        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.level_count(LogLevel::Info), 1);
        assert_eq!(stats.level_count(LogLevel::Critical), 1);
        assert_eq!(
            stats.counts_by_logger[0],
            LoggerCount {
                logger_name: "rag.server".to_string(),
                count: 3
            }
        );
        assert_eq!(stats.counts_by_logger[1].logger_name, "rag.engine");
        assert_eq!(stats.oldest_timestamp, Some(at(0)));
        assert_eq!(stats.newest_timestamp, Some(at(4)));
    }

    #[tokio::test]
    async fn test_stats_empty_store() {
        let (_dir, store) = create_test_store().await;

        let stats = store.stats().await.unwrap();

        assert_eq!(stats.total_count, 0);
        assert!(stats.counts_by_level.is_empty());
        assert!(stats.counts_by_logger.is_empty());
        assert_eq!(stats.oldest_timestamp, None);
        assert_eq!(stats.newest_timestamp, None);
    }

    #[tokio::test]
    async fn test_stats_serializes_level_names() {
        let (_dir, store) = create_test_store().await;
        seed(&store).await;

        let json = serde_json::to_value(store.stats().await.unwrap()).unwrap();
        assert_eq!(json["counts_by_level"]["WARNING"], 1);
    }
}
