//! Marketplace ledger daemon

use parcel_ledger::{Config, InMemoryFunds, MarketLedger, SystemClock};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting parcel-ledger daemon");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger with in-process collaborators
    let funds = Arc::new(InMemoryFunds::new());
    let ledger = MarketLedger::open(config, funds, Arc::new(SystemClock)).await?;
    tracing::info!(events = ledger.event_count(), "Ledger opened");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down parcel-ledger daemon");
    ledger.shutdown().await?;
    Ok(())
}
