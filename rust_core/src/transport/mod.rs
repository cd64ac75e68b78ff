//! Messaging transport seam: inbound channel posts, lookups and permalinks.

pub mod subscription;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub use subscription::{load_channel_ids, SubscriptionDiff, SubscriptionSet};

/// One channel post as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    #[serde(default)]
    pub text: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub has_photo: bool,
    /// Base64 photo bytes, when the relay attached them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_title: Option<String>,
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn get_message_by_id(&self, chat_id: i64, message_id: i64) -> Result<Option<InboundMessage>>;

    /// Messages of one chat matching `query`, newest first.
    async fn search_messages(&self, chat_id: i64, query: &str, limit: usize) -> Result<Vec<InboundMessage>>;

    async fn download_media(&self, message: &InboundMessage) -> Result<Option<Vec<u8>>>;

    async fn channel_title(&self, chat_id: i64) -> Result<Option<String>>;

    /// Every known (chat id, title) pair.
    async fn channels(&self) -> Result<Vec<(i64, String)>>;

    async fn subscribe(&self, chat_id: i64) -> Result<()>;

    async fn unsubscribe(&self, chat_id: i64) -> Result<()>;
}

/// `https://t.me/c/<id without -100>/<message id>`
pub fn permalink(chat_id: i64, message_id: i64) -> String {
    let id = chat_id.to_string();
    let short = id.strip_prefix("-100").unwrap_or(&id);
    format!("https://t.me/c/{}/{}", short, message_id)
}

fn permalink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"t\.me/c/(\d+)/(\d+)").expect("static regex"))
}

/// Inverse of [`permalink`]; `None` for anything malformed.
pub fn parse_permalink(link: &str) -> Option<(i64, i64)> {
    let caps = permalink_re().captures(link)?;
    let chat_id: i64 = format!("-100{}", &caps[1]).parse().ok()?;
    let message_id: i64 = caps[2].parse().ok()?;
    Some((chat_id, message_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permalink_round_trip() {
        let link = permalink(-1001234567890, 42);
        assert_eq!(link, "https://t.me/c/1234567890/42");
        assert_eq!(parse_permalink(&link), Some((-1001234567890, 42)));
    }

    #[test]
    fn test_malformed_permalinks() {
        assert_eq!(parse_permalink(""), None);
        assert_eq!(parse_permalink("https://t.me/canal/42"), None);
        assert_eq!(parse_permalink("https://t.me/c/abc/42"), None);
    }

    #[test]
    fn test_inbound_message_defaults() {
        let msg: InboundMessage = serde_json::from_str(
            r#"{"chat_id": -1001, "message_id": 5, "date": "2026-10-19T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.text, "");
        assert!(!msg.has_photo);
        assert!(msg.media.is_none());
    }
}
