//! Redis PubSub with automatic reconnection and a mutable channel set.
//!
//! A background task owns the PubSub connection. Subscribe/unsubscribe
//! requests arrive over an mpsc channel and are applied between messages;
//! after a reconnect the task resubscribes to everything it holds.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use redis::aio::PubSub;
use redis::{Client, Msg};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Configuration for reconnection behavior
#[derive(Clone, Debug)]
pub struct ReconnectConfig {
    /// Base delay in milliseconds for exponential backoff (default: 1000ms)
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (default: 60000ms)
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ReconnectConfig {
    pub fn from_env() -> Self {
        Self {
            base_delay_ms: std::env::var("REDIS_RECONNECT_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            max_delay_ms: std::env::var("REDIS_RECONNECT_MAX_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60000),
        }
    }

    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(exponential.min(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionCommand {
    Subscribe(String),
    Unsubscribe(String),
}

/// Spawn the subscriber task. Raw messages go to `sender`.
pub fn spawn_subscriber(
    client: Client,
    config: ReconnectConfig,
    commands: mpsc::UnboundedReceiver<SubscriptionCommand>,
    sender: mpsc::UnboundedSender<Msg>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(subscriber_task(client, config, commands, sender))
}

async fn connect_and_subscribe(client: &Client, channels: &BTreeSet<String>) -> Result<PubSub> {
    let conn = client
        .get_async_connection()
        .await
        .context("Failed to get async Redis connection")?;
    let mut pubsub = conn.into_pubsub();
    for channel in channels {
        pubsub
            .subscribe(channel)
            .await
            .with_context(|| format!("Failed to subscribe to channel: {}", channel))?;
    }
    info!("Subscribed to {} channels", channels.len());
    Ok(pubsub)
}

/// What interrupted message forwarding.
enum Interrupt {
    Command(SubscriptionCommand),
    ConnectionLost,
    Shutdown,
}

async fn subscriber_task(
    client: Client,
    config: ReconnectConfig,
    mut commands: mpsc::UnboundedReceiver<SubscriptionCommand>,
    sender: mpsc::UnboundedSender<Msg>,
) {
    let mut channels: BTreeSet<String> = BTreeSet::new();
    let mut failures: u32 = 0;

    loop {
        let mut pubsub = match connect_and_subscribe(&client, &channels).await {
            Ok(pubsub) => {
                failures = 0;
                pubsub
            }
            Err(e) => {
                failures += 1;
                let delay = config.calculate_delay(failures);
                error!(
                    "Failed to connect (attempt {}): {:#}. Retrying in {:?}...",
                    failures, e, delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        loop {
            let interrupt = {
                let mut stream = pubsub.on_message();
                loop {
                    tokio::select! {
                        msg = stream.next() => match msg {
                            Some(msg) => {
                                if sender.send(msg).is_err() {
                                    break Interrupt::Shutdown;
                                }
                            }
                            None => break Interrupt::ConnectionLost,
                        },
                        cmd = commands.recv() => match cmd {
                            Some(cmd) => break Interrupt::Command(cmd),
                            None => break Interrupt::Shutdown,
                        },
                    }
                }
            };

            match interrupt {
                Interrupt::Shutdown => {
                    info!("Subscriber owner dropped, stopping subscriber task");
                    return;
                }
                Interrupt::ConnectionLost => {
                    warn!("Redis PubSub stream ended, will reconnect...");
                    break;
                }
                Interrupt::Command(SubscriptionCommand::Subscribe(channel)) => {
                    if let Err(e) = pubsub.subscribe(&channel).await {
                        warn!("Subscribe to {} failed, will retry on reconnect: {}", channel, e);
                    }
                    channels.insert(channel);
                }
                Interrupt::Command(SubscriptionCommand::Unsubscribe(channel)) => {
                    if let Err(e) = pubsub.unsubscribe(&channel).await {
                        warn!("Unsubscribe from {} failed: {}", channel, e);
                    }
                    channels.remove(&channel);
                }
            }
        }
    }
}
