use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use logbook::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    if let cli::Commands::Version = args.command {
        println!("logbook v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = config::load_config(&args.config)?;
    init_tracing(&cfg.logging, None);

    let store = commands::open_store(&cfg).await?;

    // Dispatch to appropriate command handler
    let result = match args.command {
        cli::Commands::Logs(logs) => commands::logs::execute(&store, logs).await,
        cli::Commands::Search { text, limit } => {
            commands::logs::search(&store, &text, limit).await
        }
        cli::Commands::Show { id } => commands::logs::show(&store, id).await,
        cli::Commands::Stats => commands::maintenance::show_stats(&store).await,
        cli::Commands::Loggers => commands::maintenance::list_loggers(&store).await,
        cli::Commands::Export(export) => commands::export::execute(&store, export).await,
        cli::Commands::Cleanup { days } => {
            let days = days.unwrap_or(cfg.store.retention_days);
            commands::maintenance::run_cleanup(&store, days).await
        }
        cli::Commands::Clear { yes } => commands::maintenance::clear(&store, yes).await,
        cli::Commands::Emit(emit) => {
            commands::emit::execute(store.clone(), cfg.store.min_level, emit).await
        }
        cli::Commands::Version => Ok(()),
    };

    store.close().await;
    result
}
