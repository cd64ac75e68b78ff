//! Reloadable channel subscription set.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::MessageTransport;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    ids: BTreeSet<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionDiff {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}

impl SubscriptionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl SubscriptionSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, chat_id: i64) -> bool {
        self.ids.contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// What has to change to go from `self` to `next`.
    pub fn diff(&self, next: &SubscriptionSet) -> SubscriptionDiff {
        SubscriptionDiff {
            added: next.ids.difference(&self.ids).copied().collect(),
            removed: self.ids.difference(&next.ids).copied().collect(),
        }
    }

    /// Issue the subscribe/unsubscribe calls for `diff`.
    ///
    /// Returns the set actually in effect; a failed call keeps the old state
    /// for that id so the next reload retries it.
    pub async fn apply(
        &self,
        diff: &SubscriptionDiff,
        transport: &dyn MessageTransport,
    ) -> SubscriptionSet {
        let mut current = self.clone();
        for chat_id in &diff.added {
            match transport.subscribe(*chat_id).await {
                Ok(()) => {
                    info!(chat_id, "Subscribed to channel");
                    current.ids.insert(*chat_id);
                }
                Err(e) => warn!(chat_id, "Subscribe failed: {:#}", e),
            }
        }
        for chat_id in &diff.removed {
            match transport.unsubscribe(*chat_id).await {
                Ok(()) => {
                    info!(chat_id, "Unsubscribed from channel");
                    current.ids.remove(chat_id);
                }
                Err(e) => warn!(chat_id, "Unsubscribe failed: {:#}", e),
            }
        }
        current
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read `{"telegram_channel_ids": [...]}`; ids may be numbers or strings.
pub fn load_channel_ids(path: &Path) -> Result<SubscriptionSet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read channel list {}", path.display()))?;
    let data: Value = serde_json::from_str(&content)
        .with_context(|| format!("Channel list {} is not valid JSON", path.display()))?;
    let ids = data["telegram_channel_ids"]
        .as_array()
        .map(|items| items.iter().filter_map(parse_id).collect::<Vec<_>>())
        .unwrap_or_default();
    Ok(SubscriptionSet::new(ids))
}
