pub mod config;
pub mod error;
pub mod store;

use crate::config::{LogFormat, LoggingConfig};
use crate::store::{AsyncWriter, StoreLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` overrides the configured filter. When `writer` is given, every
/// event that passes the filter is also persisted to the log store.
///
/// Note: This function can only be called once per process; later calls
/// print a warning and leave the first subscriber in place.
pub fn init_tracing(config: &LoggingConfig, writer: Option<AsyncWriter>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let console_layer = config.also_console.then(|| match config.format {
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    });
    let store_layer = writer.map(StoreLayer::new);

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(store_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!("Warning: Failed to initialize tracing: {}", e);
    }
}
