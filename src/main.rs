//! cbctl - operate circuit breakers from the command line
//!
//! This is the composition root that wires the configured statistics store
//! into the command handlers.

use circuit_breaker::adapters::inbound::{self, Cli};
use circuit_breaker::{
    load_config, DashMapStatisticsStore, RedisStatisticsStore, SqliteStatisticsStore,
    StatisticsStore, StoreKind,
};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let store: Arc<dyn StatisticsStore> = match cfg.store {
        StoreKind::Memory => {
            tracing::warn!("memory store selected, state is discarded on exit");
            Arc::new(DashMapStatisticsStore::new())
        }
        StoreKind::Sqlite => {
            tracing::debug!("statistics store: sqlite path={}", cfg.sqlite_path);
            Arc::new(SqliteStatisticsStore::open(&cfg.sqlite_path)?)
        }
        StoreKind::Redis => Arc::new(RedisStatisticsStore::connect(&cfg.redis_url).await?),
    };

    let output = inbound::run(cli.command, store, cfg.breaker).await?;
    println!("{}", output);

    Ok(())
}
