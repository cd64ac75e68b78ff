//! Tip Listener Service
//!
//! Single-threaded process that:
//! - Listens for new posts in the configured channels and records tips
//! - Reloads the channel list on a timer
//! - Runs the periodic results loop

mod supervisor;

use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tipsheet_core::db::{create_pool, DbPoolConfig, SqliteProcessedStore};
use tipsheet_core::ingest::IngestHandler;
use tipsheet_core::redis::RedisTransport;
use tipsheet_core::results::ResultsOrchestrator;
use tipsheet_core::transport::{load_channel_ids, MessageTransport, SubscriptionSet};
use tipsheet_core::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Tip Listener Service...");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(?config, "Configuration loaded");

    // Collaborators
    let ai = config.completion_client();
    let resolver = config.resolver(ai.clone(), config.alias_store());
    let pipeline = config.pipeline(ai, resolver.clone());
    let store = config.row_store();

    let pool = create_pool(&config.database_url, DbPoolConfig::from_env()).await?;
    let processed = Arc::new(SqliteProcessedStore::new(pool).await?);

    let (transport, inbound) = RedisTransport::connect(&config.redis_url)
        .await
        .context("Failed to connect message transport")?;
    let transport: Arc<dyn MessageTransport> = Arc::new(transport);

    // Initial subscriptions
    let wanted = load_channel_ids(&config.channels_config_path)?;
    let empty = SubscriptionSet::default();
    let subscriptions = empty.apply(&empty.diff(&wanted), transport.as_ref()).await;
    info!(channels = subscriptions.len(), "Subscribed to channels");

    let handler = IngestHandler::new(
        pipeline,
        transport.clone(),
        store.clone(),
        processed,
        &config.live_table,
    );
    let results = ResultsOrchestrator::new(resolver, store, config.results_config());

    tokio::select! {
        _ = handler.run(inbound) => {
            error!("Inbound listener stopped");
            Err(anyhow!("message transport closed"))
        }
        _ = results.run_forever() => Ok(()),
        _ = supervisor::reload_channels(
            transport,
            config.channels_config_path.clone(),
            subscriptions,
            Duration::from_secs(config.channel_reload_secs),
        ) => Ok(()),
    }
}
