//! Inbound listener: one channel post in, at most one live-table row out.

use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::db::ProcessedMessageStore;
use crate::extraction::{ExtractionValidator, PostContent, ProcessStatus};
use crate::models::BetRecord;
use crate::sheet::{append_record, RowStore};
use crate::transport::{permalink, InboundMessage, MessageTransport};

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Duplicate,
    Recorded { bet_id: String },
    Ignored { label: String },
    Failed { reason: String },
}

pub struct IngestHandler {
    pipeline: Arc<ExtractionValidator>,
    transport: Arc<dyn MessageTransport>,
    store: Arc<dyn RowStore>,
    processed: Arc<dyn ProcessedMessageStore>,
    live_table: String,
}

impl IngestHandler {
    pub fn new(
        pipeline: Arc<ExtractionValidator>,
        transport: Arc<dyn MessageTransport>,
        store: Arc<dyn RowStore>,
        processed: Arc<dyn ProcessedMessageStore>,
        live_table: &str,
    ) -> Self {
        Self {
            pipeline,
            transport,
            store,
            processed,
            live_table: live_table.to_string(),
        }
    }

    async fn channel_name(&self, message: &InboundMessage) -> String {
        if let Some(title) = message.chat_title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        match self.transport.channel_title(message.chat_id).await {
            Ok(Some(title)) => title,
            Ok(None) => message.chat_id.to_string(),
            Err(e) => {
                warn!(chat_id = message.chat_id, "Channel title lookup failed: {:#}", e);
                message.chat_id.to_string()
            }
        }
    }

    async fn mark_processed(&self, message: &InboundMessage) {
        if let Err(e) = self.processed.add(message.chat_id, message.message_id).await {
            warn!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                "Failed to mark message processed: {:#}",
                e
            );
        }
    }

    /// Never fails; every problem is logged and reported in the outcome.
    pub async fn handle(&self, message: &InboundMessage) -> IngestOutcome {
        let (chat_id, message_id) = (message.chat_id, message.message_id);

        match self.processed.has(chat_id, message_id).await {
            Ok(true) => {
                debug!(chat_id, message_id, "Already processed");
                return IngestOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => warn!(chat_id, message_id, "Dedup lookup failed, processing anyway: {:#}", e),
        }

        let image = if message.has_photo {
            match self.transport.download_media(message).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(chat_id, message_id, "Media download failed: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        let post = PostContent {
            message_id,
            text: message.text.clone(),
            image,
            channel_name: self.channel_name(message).await,
            posted_at: message.date.with_timezone(&Local).naive_local(),
        };
        info!(chat_id, message_id, channel = %post.channel_name, "Processing message");

        let outcome = self.pipeline.process(&post).await;
        let result = match (outcome.status, outcome.payload) {
            (ProcessStatus::Success, Some(payload)) => {
                let record = BetRecord::from_payload(
                    &payload,
                    &permalink(chat_id, message_id),
                    None,
                    Local::now().naive_local(),
                );
                if let Err(e) = append_record(self.store.as_ref(), &self.live_table, &record).await {
                    error!(chat_id, message_id, bet_id = %record.bet_id, "Row write failed: {:#}", e);
                    return IngestOutcome::Failed {
                        reason: format!("row write failed: {:#}", e),
                    };
                }
                info!(chat_id, message_id, bet_id = %record.bet_id, "Bet recorded");
                IngestOutcome::Recorded {
                    bet_id: record.bet_id,
                }
            }
            (ProcessStatus::Ignored, _) => IngestOutcome::Ignored {
                label: outcome.reason.unwrap_or_default(),
            },
            _ => {
                let reason = outcome.reason.unwrap_or_else(|| "processing error".to_string());
                warn!(chat_id, message_id, reason = %reason, "Message not recorded");
                IngestOutcome::Failed { reason }
            }
        };

        self.mark_processed(message).await;
        result
    }

    /// Drain the inbound receiver until the transport closes it.
    pub async fn run(&self, mut inbound: mpsc::UnboundedReceiver<InboundMessage>) {
        info!(table = %self.live_table, "Listening for new messages");
        while let Some(message) = inbound.recv().await {
            self.handle(&message).await;
        }
        warn!("Inbound stream closed");
    }
}
