//! Results Updater Service
//!
//! Runs the results loop on its own: settles pending bets once their
//! fixtures finish and archives settled rows into monthly tables.

use anyhow::{Context, Result};
use dotenv::dotenv;
use tipsheet_core::results::ResultsOrchestrator;
use tipsheet_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Results Updater Service...");

    let config = Config::from_env().context("Invalid configuration")?;
    let ai = config.completion_client();
    let resolver = config.resolver(ai, config.alias_store());

    ResultsOrchestrator::new(resolver, config.row_store(), config.results_config())
        .run_forever()
        .await;
    Ok(())
}
