use thiserror::Error;

/// Errors surfaced by the log store's read and maintenance paths.
///
/// The write path (`RecordSink::emit`) never returns these to its caller;
/// they are forwarded to the sink's fallback reporter instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached in bounded time (pool exhausted,
    /// file locked by someone else, I/O failure)
    #[error("log store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// The statement ran but failed
    #[error("log query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// The filter combination cannot be executed
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// Schema creation failed
    #[error("log store schema setup failed: {0}")]
    Schema(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be hydrated into a record
    #[error("corrupt log record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

impl StoreError {
    /// True when retrying later may succeed
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_unavailable(&err) {
            Self::Unavailable(err)
        } else {
            Self::Query(err)
        }
    }
}

// SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN (primary codes; extended codes
// carry the primary code in the low byte)
const UNAVAILABLE_SQLITE_CODES: [i32; 3] = [5, 6, 14];

fn is_unavailable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| UNAVAILABLE_SQLITE_CODES.contains(&(code & 0xff)))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let error = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_unavailable());
        assert!(error.to_string().starts_with("log store unavailable"));
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let error = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, StoreError::Query(_)));
        assert!(!error.is_unavailable());
    }

    #[test]
    fn test_error_display() {
        let error = StoreError::InvalidFilter("start after end".to_string());
        assert_eq!(error.to_string(), "invalid log filter: start after end");

        let error = StoreError::CorruptRecord {
            id: 7,
            reason: "bad timestamp".to_string(),
        };
        assert_eq!(error.to_string(), "corrupt log record 7: bad timestamp");
    }
}
