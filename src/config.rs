use crate::store::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Legacy environment variables, applied last
const LEGACY_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("LOG_DB_PATH", "store.database_path"),
    ("LOG_LEVEL", "store.min_level"),
    ("LOG_RETENTION_DAYS", "store.retention_days"),
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    /// Records below this level are not persisted
    pub min_level: LogLevel,
    pub retention_days: u32,
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
    /// Hour of day (UTC) for scheduled retention
    pub cleanup_hour: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/logs.db"),
            min_level: LogLevel::Info,
            retention_days: 30,
            busy_timeout_ms: 5000,
            max_connections: 4,
            cleanup_hour: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
    pub format: LogFormat,
    pub also_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
            also_console: true,
        }
    }
}

/// Load configuration: defaults, optional TOML file, `LOGBOOK__*` environment
/// variables, then the legacy `LOG_DB_PATH` / `LOG_LEVEL` / `LOG_RETENTION_DAYS`
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

fn load_config_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Config> {
    let mut builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("LOGBOOK").separator("__"));

    for (var, key) in LEGACY_ENV_OVERRIDES {
        builder = builder.set_override_option(key, env(var))?;
    }

    let cfg: Config = builder.build()?.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.store.database_path.as_os_str().is_empty() {
        anyhow::bail!("store.database_path cannot be empty");
    }

    if cfg.store.max_connections == 0 {
        anyhow::bail!("store.max_connections must be at least 1");
    }

    if cfg.store.busy_timeout_ms == 0 {
        anyhow::bail!("store.busy_timeout_ms must be greater than 0");
    }

    if cfg.store.cleanup_hour > 23 {
        anyhow::bail!(
            "store.cleanup_hour must be between 0 and 23, got {}",
            cfg.store.cleanup_hour
        );
    }

    Ok(())
}
