//! Command implementations for the CLI
//!
//! - logs: Query, search and follow stored logs; show a single record
//! - export: CSV / JSON export
//! - maintenance: Statistics, logger listing, retention cleanup, clear
//! - emit: Write a single record

pub mod emit;
pub mod export;
pub mod logs;
pub mod maintenance;

use anyhow::{Context, Result};
use logbook::config::Config;
use logbook::store::{LogStore, StoreOptions};
use std::sync::Arc;

/// Open the store described by the configuration
pub async fn open_store(cfg: &Config) -> Result<Arc<LogStore>> {
    let store = LogStore::open(&StoreOptions::from(&cfg.store))
        .await
        .with_context(|| {
            format!(
                "Failed to open log store at {}",
                cfg.store.database_path.display()
            )
        })?;
    Ok(Arc::new(store))
}
