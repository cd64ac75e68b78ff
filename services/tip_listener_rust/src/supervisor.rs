//! Channel-list reload supervisor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tipsheet_core::transport::{load_channel_ids, MessageTransport, SubscriptionSet};
use tracing::{info, warn};

/// Re-read the channel list every `interval` and apply the difference.
///
/// A missing or malformed file keeps the current subscriptions.
pub async fn reload_channels(
    transport: Arc<dyn MessageTransport>,
    path: PathBuf,
    mut current: SubscriptionSet,
    interval: Duration,
) {
    loop {
        tokio::time::sleep(interval).await;
        let next = match load_channel_ids(&path) {
            Ok(next) => next,
            Err(e) => {
                warn!("Channel list reload failed: {:#}", e);
                continue;
            }
        };
        let diff = current.diff(&next);
        if diff.is_empty() {
            continue;
        }
        info!(added = ?diff.added, removed = ?diff.removed, "Channel list changed");
        current = current.apply(&diff, transport.as_ref()).await;
    }
}
