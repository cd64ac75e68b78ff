//! Redis-backed message transport.
//!
//! A relay process publishes each channel post as JSON on
//! `tips:inbound:<chat_id>` and stores it under the message id in the hash
//! `tips:archive:<chat_id>`. Channel titles live in the hash `tips:channels`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use redis::Msg;
use tokio::sync::mpsc;
use tracing::warn;

use super::bus::RedisBus;
use super::pubsub_reconnect::{spawn_subscriber, ReconnectConfig, SubscriptionCommand};
use crate::transport::{InboundMessage, MessageTransport};

pub const INBOUND_PREFIX: &str = "tips:inbound:";
pub const ARCHIVE_PREFIX: &str = "tips:archive:";
pub const CHANNELS_KEY: &str = "tips:channels";

pub fn inbound_channel(chat_id: i64) -> String {
    format!("{}{}", INBOUND_PREFIX, chat_id)
}

pub fn archive_key(chat_id: i64) -> String {
    format!("{}{}", ARCHIVE_PREFIX, chat_id)
}

/// Every query word must appear in the message text.
pub fn matches_query(text: &str, query: &str) -> bool {
    let haystack = text.to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .all(|word| haystack.contains(word))
}

pub struct RedisTransport {
    bus: RedisBus,
    commands: mpsc::UnboundedSender<SubscriptionCommand>,
}

impl RedisTransport {
    /// Connect and start the subscriber task. New posts arrive on the returned receiver.
    pub async fn connect(
        redis_url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<InboundMessage>)> {
        let bus = RedisBus::new(redis_url).await?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Msg>();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        spawn_subscriber(bus.get_client(), ReconnectConfig::default(), command_rx, raw_tx);

        tokio::spawn(async move {
            while let Some(msg) = raw_rx.recv().await {
                let channel = msg.get_channel_name().to_string();
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(channel = %channel, "Unreadable payload: {}", e);
                        continue;
                    }
                };
                match serde_json::from_str::<InboundMessage>(&payload) {
                    Ok(message) => {
                        if message_tx.send(message).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(channel = %channel, "Malformed inbound message: {}", e),
                }
            }
        });

        Ok((
            Self {
                bus,
                commands: command_tx,
            },
            message_rx,
        ))
    }

    async fn archived(&self, chat_id: i64) -> Result<Vec<InboundMessage>> {
        let values = self.bus.hash_values(&archive_key(chat_id)).await?;
        Ok(values
            .iter()
            .filter_map(|v| serde_json::from_str::<InboundMessage>(v).ok())
            .collect())
    }
}

#[async_trait]
impl MessageTransport for RedisTransport {
    async fn get_message_by_id(&self, chat_id: i64, message_id: i64) -> Result<Option<InboundMessage>> {
        let raw = self
            .bus
            .hash_get(&archive_key(chat_id), &message_id.to_string())
            .await?;
        match raw {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).context("Archived message is not valid JSON")?,
            )),
            None => Ok(None),
        }
    }

    async fn search_messages(&self, chat_id: i64, query: &str, limit: usize) -> Result<Vec<InboundMessage>> {
        let mut hits: Vec<InboundMessage> = self
            .archived(chat_id)
            .await?
            .into_iter()
            .filter(|m| matches_query(&m.text, query))
            .collect();
        hits.sort_by(|a, b| b.message_id.cmp(&a.message_id));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn download_media(&self, message: &InboundMessage) -> Result<Option<Vec<u8>>> {
        match &message.media {
            Some(encoded) => Ok(Some(
                BASE64.decode(encoded).context("Message media is not valid base64")?,
            )),
            None => Ok(None),
        }
    }

    async fn channel_title(&self, chat_id: i64) -> Result<Option<String>> {
        self.bus.hash_get(CHANNELS_KEY, &chat_id.to_string()).await
    }

    async fn channels(&self) -> Result<Vec<(i64, String)>> {
        Ok(self
            .bus
            .hash_all(CHANNELS_KEY)
            .await?
            .into_iter()
            .filter_map(|(id, title)| id.parse().ok().map(|id| (id, title)))
            .collect())
    }

    async fn subscribe(&self, chat_id: i64) -> Result<()> {
        self.commands
            .send(SubscriptionCommand::Subscribe(inbound_channel(chat_id)))
            .context("Subscriber task is gone")
    }

    async fn unsubscribe(&self, chat_id: i64) -> Result<()> {
        self.commands
            .send(SubscriptionCommand::Unsubscribe(inbound_channel(chat_id)))
            .context("Subscriber task is gone")
    }
}
