//! Auditor
//!
//! One-shot reconciliation: re-derives every live row from its source
//! message and writes the corrected copy to a new table.

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tipsheet_core::audit::Auditor;
use tipsheet_core::redis::RedisTransport;
use tipsheet_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Auditor...");

    let config = Config::from_env().context("Invalid configuration")?;
    let ai = config.completion_client();
    let resolver = config.resolver(ai.clone(), config.alias_store());
    let pipeline = config.pipeline(ai, resolver);

    // Lookups only; new posts are not consumed here.
    let (transport, _inbound) = RedisTransport::connect(&config.redis_url)
        .await
        .context("Failed to connect message transport")?;

    let auditor = Auditor::new(
        pipeline,
        Arc::new(transport),
        config.row_store(),
        &config.live_table,
        config.audit_fallback_channel,
    );
    let report = auditor.run().await?;

    info!(
        table = %report.table,
        rows = report.rows_written,
        corrected = report.corrected,
        kept = report.kept,
        duplicates = report.duplicates_dropped,
        "Reconstructed table written"
    );
    Ok(())
}
