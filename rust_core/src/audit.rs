//! One-pass reconciliation of the live table against its source messages.
//!
//! Every row is re-derived from the message it came from. Rows that cannot be
//! re-derived with confidence are copied verbatim, and the result goes to a
//! new table; the live table is only read.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::extraction::{ExtractionValidator, PostContent, ProcessStatus};
use crate::models::{BetRecord, TeamIdField};
use crate::sheet::{ensure_header, read_bet_rows, Column, RowStore, StoredRow};
use crate::transport::{parse_permalink, permalink, InboundMessage, MessageTransport};
use crate::utils::text::{collapse_whitespace, first_words};

const SEARCH_WORDS: usize = 4;
const SEARCH_LIMIT: usize = 5;

/// `<live>_CORRIGIDA_<YYYYmmdd_HHMM>`
pub fn corrected_table_name(live_table: &str, now: NaiveDateTime) -> String {
    format!("{}_CORRIGIDA_{}", live_table, now.format("%Y%m%d_%H%M"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub table: String,
    pub rows_written: usize,
    pub corrected: usize,
    pub kept: usize,
    pub duplicates_dropped: usize,
}

pub struct Auditor {
    pipeline: Arc<ExtractionValidator>,
    transport: Arc<dyn MessageTransport>,
    store: Arc<dyn RowStore>,
    live_table: String,
    fallback_channel: Option<i64>,
}

impl Auditor {
    pub fn new(
        pipeline: Arc<ExtractionValidator>,
        transport: Arc<dyn MessageTransport>,
        store: Arc<dyn RowStore>,
        live_table: &str,
        fallback_channel: Option<i64>,
    ) -> Self {
        Self {
            pipeline,
            transport,
            store,
            live_table: live_table.to_string(),
            fallback_channel,
        }
    }

    /// Run the whole pass and write the reconstructed table.
    pub async fn run(&self) -> Result<AuditReport> {
        self.run_at(Local::now().naive_local()).await
    }

    pub async fn run_at(&self, now: NaiveDateTime) -> Result<AuditReport> {
        let rows = read_bet_rows(self.store.as_ref(), &self.live_table).await?;
        let channels = match self.transport.channels().await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Channel list unavailable, search fallback limited: {:#}", e);
                Vec::new()
            }
        };
        info!(table = %self.live_table, rows = rows.len(), "Starting audit");

        let mut report = AuditReport {
            table: corrected_table_name(&self.live_table, now),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        let mut output = Vec::with_capacity(rows.len());

        for row in &rows {
            let bet_id = row.bet_id();
            if bet_id.is_empty() {
                debug!(row = row.row_number, "Row without bet id, copying");
                report.kept += 1;
                output.push(row.layout_cells());
                continue;
            }
            if !seen.insert(bet_id.to_string()) {
                warn!(row = row.row_number, bet_id, "Duplicate bet id, dropping");
                report.duplicates_dropped += 1;
                continue;
            }

            match self.reconstruct(row, &channels).await {
                Some(cells) => {
                    info!(row = row.row_number, bet_id, "Row corrected");
                    report.corrected += 1;
                    output.push(cells);
                }
                None => {
                    report.kept += 1;
                    output.push(row.layout_cells());
                }
            }
        }

        ensure_header(self.store.as_ref(), &report.table).await?;
        report.rows_written = output.len();
        if !output.is_empty() {
            self.store.append_rows(&report.table, output).await?;
        }
        info!(
            table = %report.table,
            corrected = report.corrected,
            kept = report.kept,
            duplicates = report.duplicates_dropped,
            "Audit finished"
        );
        Ok(report)
    }

    /// Replacement cells for `row`, or `None` to keep it as it is.
    async fn reconstruct(&self, row: &StoredRow, channels: &[(i64, String)]) -> Option<Vec<String>> {
        let bet_id = row.bet_id();
        let Some(message) = self.locate(row, channels).await else {
            warn!(row = row.row_number, bet_id, "Source message not found, keeping row");
            return None;
        };

        let image = if message.has_photo {
            self.transport.download_media(&message).await.unwrap_or_else(|e| {
                warn!(bet_id, message_id = message.message_id, "Media download failed: {:#}", e);
                None
            })
        } else {
            None
        };
        let channel_name = message
            .chat_title
            .clone()
            .or_else(|| {
                channels
                    .iter()
                    .find(|(id, _)| *id == message.chat_id)
                    .map(|(_, title)| title.clone())
            })
            .unwrap_or_else(|| message.chat_id.to_string());

        let posted_at = message.date.with_timezone(&Local).naive_local();
        let post = PostContent {
            message_id: message.message_id,
            text: message.text.clone(),
            image,
            channel_name,
            posted_at,
        };
        let outcome = self.pipeline.process(&post).await;
        let payload = match (outcome.status, outcome.payload) {
            (ProcessStatus::Success, Some(payload)) => payload,
            (status, _) => {
                warn!(
                    bet_id,
                    message_id = message.message_id,
                    ?status,
                    reason = outcome.reason.as_deref().unwrap_or(""),
                    "Re-processing did not yield a bet, keeping row"
                );
                return None;
            }
        };
        if payload.home_team_id == TeamIdField::NotFound || payload.away_team_id == TeamIdField::NotFound {
            warn!(bet_id, message_id = message.message_id, "Fixture lookup failed, keeping row");
            return None;
        }

        // Relative dates in the post refer to the day it was posted.
        let record = BetRecord::from_payload(
            &payload,
            &permalink(message.chat_id, message.message_id),
            Some(bet_id),
            posted_at,
        );
        let mut cells = record.to_row();
        // Status belongs to the results loop and administrators.
        cells[Column::Status.index()] = row.get(Column::Status).to_string();
        Some(cells)
    }

    /// Permalink first, then a text search in the tipster's channel.
    async fn locate(&self, row: &StoredRow, channels: &[(i64, String)]) -> Option<InboundMessage> {
        let link = row.get(Column::SourceLink);
        match parse_permalink(link) {
            Some((chat_id, message_id)) => match self.transport.get_message_by_id(chat_id, message_id).await {
                Ok(Some(message)) => return Some(message),
                Ok(None) => debug!(bet_id = row.bet_id(), link, "Permalink target missing"),
                Err(e) => warn!(bet_id = row.bet_id(), link, "Permalink lookup failed: {:#}", e),
            },
            None => warn!(bet_id = row.bet_id(), link, "Malformed permalink"),
        }
        self.search_fallback(row, channels).await
    }

    async fn search_fallback(&self, row: &StoredRow, channels: &[(i64, String)]) -> Option<InboundMessage> {
        let tipster = row.get(Column::Tipster).trim().to_lowercase();
        let chat_id = channels
            .iter()
            .find(|(_, title)| !tipster.is_empty() && title.to_lowercase().contains(&tipster))
            .map(|(id, _)| *id)
            .or(self.fallback_channel)?;

        let reference = [Column::Entry, Column::Description, Column::Match]
            .into_iter()
            .map(|c| row.get(c).trim())
            .find(|text| !text.is_empty())
            .map(collapse_whitespace)?;
        let query = first_words(&reference, SEARCH_WORDS);

        let hits = match self.transport.search_messages(chat_id, &query, SEARCH_LIMIT).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(bet_id = row.bet_id(), chat_id, "Message search failed: {:#}", e);
                return None;
            }
        };
        debug!(bet_id = row.bet_id(), chat_id, query = %query, hits = hits.len(), "Search fallback");

        hits.into_iter()
            .map(|m| (strsim::jaro_winkler(&collapse_whitespace(&m.text), &reference), m))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, message)| message)
    }
}
