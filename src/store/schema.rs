//! Schema management
//!
//! The `logs` table and its indexes live in `migrations/`. Every statement
//! there is `IF NOT EXISTS`, and sqlx records applied migrations, so running
//! this on every start is safe.

use crate::error::Result;
use sqlx::migrate::Migrator;
use sqlx::SqlitePool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create the log table and indexes if absent
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    tracing::debug!("Log store schema ready");
    Ok(())
}
