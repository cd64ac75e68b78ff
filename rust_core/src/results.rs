//! Periodic results loop: settle pending bets, then move settled rows to
//! monthly cold tables.
//!
//! Each cycle works from a single snapshot of the live table. Cell updates
//! go out in one batch, and rows are deleted bottom-up so earlier row numbers
//! stay valid.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::matching::MatchResolver;
use crate::models::BetStatus;
use crate::outcome::determine_outcome;
use crate::sheet::{ensure_header, read_bet_rows, CellUpdate, Column, RowStore, StoredRow};
use crate::utils::dates::month_sheet_name;

#[derive(Debug, Clone)]
pub struct ResultsConfig {
    pub live_table: String,
    /// Minimum age of a kickoff before its result is queried.
    pub grace: ChronoDuration,
    /// Pause between provider calls within a cycle.
    pub provider_pause: Duration,
    pub interval: Duration,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            live_table: "APOSTAS".to_string(),
            grace: ChronoDuration::minutes(180),
            provider_pause: Duration::from_millis(7000),
            interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pending: usize,
    pub without_ids: usize,
    pub updated: usize,
    pub archived: usize,
}

/// Pending rows whose kickoff is at least `grace` before `now`.
///
/// Rows with an unparseable event time are never selected.
pub fn select_pending(rows: &[StoredRow], now: NaiveDateTime, grace: ChronoDuration) -> Vec<&StoredRow> {
    let cutoff = now - grace;
    rows.iter()
        .filter(|row| row.status() == Some(BetStatus::Pending))
        .filter(|row| row.event_datetime().is_some_and(|dt| dt <= cutoff))
        .collect()
}

/// Cell text for a row flagged by a resolver failure.
pub fn review_cell(code: &str) -> String {
    format!("Revisão ({})", code)
}

pub struct ResultsOrchestrator {
    resolver: Arc<MatchResolver>,
    store: Arc<dyn RowStore>,
    config: ResultsConfig,
}

impl ResultsOrchestrator {
    pub fn new(resolver: Arc<MatchResolver>, store: Arc<dyn RowStore>, config: ResultsConfig) -> Self {
        Self {
            resolver,
            store,
            config,
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Local::now().naive_local()).await
    }

    pub async fn run_cycle_at(&self, now: NaiveDateTime) -> Result<CycleReport> {
        let table = self.config.live_table.as_str();
        let rows = read_bet_rows(self.store.as_ref(), table).await?;
        let pending = select_pending(&rows, now, self.config.grace);
        let mut report = CycleReport {
            pending: pending.len(),
            ..Default::default()
        };
        info!(table, rows = rows.len(), pending = pending.len(), "Results cycle started");

        let mut updates = Vec::new();
        let mut calls = 0usize;
        for row in pending {
            let (Some(home_id), Some(away_id)) = (row.home_team_id().id(), row.away_team_id().id()) else {
                debug!(row = row.row_number, bet_id = row.bet_id(), "No team IDs, left for manual annotation");
                report.without_ids += 1;
                continue;
            };
            if calls > 0 {
                tokio::time::sleep(self.config.provider_pause).await;
            }
            calls += 1;

            let event_date = row.get(Column::EventDateTime);
            let cell = match self.resolver.resolve_by_ids(home_id, away_id, event_date).await {
                Ok(fixture) if fixture.is_finished() => {
                    let outcome = determine_outcome(&row.bet_text(), &fixture);
                    info!(
                        row = row.row_number,
                        bet_id = row.bet_id(),
                        fixture_id = fixture.fixture_id,
                        ?outcome,
                        "Fixture finished"
                    );
                    match outcome.status() {
                        Some(status) => status.as_cell().to_string(),
                        None => continue,
                    }
                }
                Ok(fixture) => {
                    debug!(row = row.row_number, status = %fixture.status_short, "Fixture not finished");
                    continue;
                }
                Err(e) if e.is_transient() => {
                    warn!(row = row.row_number, bet_id = row.bet_id(), reason = e.code(), "Provider unavailable: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!(row = row.row_number, bet_id = row.bet_id(), reason = e.code(), "Flagging for review: {}", e);
                    review_cell(e.code())
                }
            };
            updates.push(CellUpdate {
                row_number: row.row_number,
                column: Column::Status,
                value: cell,
            });
        }

        if !updates.is_empty() {
            self.store.batch_update(table, &updates).await?;
            report.updated = updates.len();
            info!(table, updated = updates.len(), "Status updates written");
        }

        report.archived = self.archive(rows, &updates, now).await?;
        Ok(report)
    }

    /// Copy terminal rows to their month table, then delete them bottom-up.
    ///
    /// Works on the cycle's snapshot with this cycle's updates applied.
    async fn archive(&self, rows: Vec<StoredRow>, updates: &[CellUpdate], now: NaiveDateTime) -> Result<usize> {
        let table = self.config.live_table.as_str();
        let new_status: HashMap<usize, &str> = updates
            .iter()
            .map(|u| (u.row_number, u.value.as_str()))
            .collect();

        let mut by_month: BTreeMap<String, Vec<StoredRow>> = BTreeMap::new();
        for mut row in rows {
            if let Some(cell) = new_status.get(&row.row_number) {
                row.set(Column::Status, cell);
            }
            if !row.status().is_some_and(|s| s.is_terminal()) {
                continue;
            }
            let month = row.event_datetime().unwrap_or(now).date();
            by_month.entry(month_sheet_name(month)).or_default().push(row);
        }

        let mut archived_rows = Vec::new();
        for (sheet, rows) in by_month {
            match self.copy_to_archive(&sheet, &rows).await {
                Ok(appended) => {
                    info!(sheet = %sheet, rows = rows.len(), appended, "Rows copied to archive");
                    archived_rows.extend(rows.iter().map(|r| r.row_number));
                }
                Err(e) => error!(sheet = %sheet, "Archive copy failed, rows stay live: {:#}", e),
            }
        }

        archived_rows.sort_unstable_by(|a, b| b.cmp(a));
        let mut deleted = 0;
        for row_number in archived_rows {
            match self.store.delete_row(table, row_number).await {
                Ok(()) => deleted += 1,
                Err(e) => error!(table, row = row_number, "Delete after archive failed: {:#}", e),
            }
        }
        if deleted > 0 {
            info!(table, deleted, "Archived rows removed from live table");
        }
        Ok(deleted)
    }

    /// Append `rows` to `sheet`, skipping bet ids it already holds.
    ///
    /// A row whose earlier delete failed is still live with its copy already
    /// archived; it must not be appended a second time.
    async fn copy_to_archive(&self, sheet: &str, rows: &[StoredRow]) -> Result<usize> {
        ensure_header(self.store.as_ref(), sheet).await?;
        let archived: HashSet<String> = read_bet_rows(self.store.as_ref(), sheet)
            .await?
            .iter()
            .map(|r| r.bet_id().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let cells: Vec<Vec<String>> = rows
            .iter()
            .filter(|row| {
                let already = !row.bet_id().is_empty() && archived.contains(row.bet_id());
                if already {
                    warn!(
                        sheet,
                        row = row.row_number,
                        bet_id = row.bet_id(),
                        "Already archived, not copying again"
                    );
                }
                !already
            })
            .map(StoredRow::layout_cells)
            .collect();
        let appended = cells.len();
        if appended > 0 {
            self.store.append_rows(sheet, cells).await?;
        }
        Ok(appended)
    }

    /// Loop until the process ends; a failed cycle is logged and retried next interval.
    pub async fn run_forever(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            grace_minutes = self.config.grace.num_minutes(),
            "Results loop started"
        );
        loop {
            match self.run_cycle().await {
                Ok(report) => info!(
                    pending = report.pending,
                    without_ids = report.without_ids,
                    updated = report.updated,
                    archived = report.archived,
                    "Results cycle finished"
                ),
                Err(e) => error!("Results cycle failed: {:#}", e),
            }
            tokio::time::sleep(self.config.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(number: usize, status: &str, event: &str) -> StoredRow {
        let mut row = StoredRow::new(number, Vec::new());
        row.set(Column::Status, status);
        row.set(Column::EventDateTime, event);
        row
    }

    #[test]
    fn test_select_pending_respects_grace() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let rows = vec![
            row(2, "Pendente", "19/10/2026 19:00"),
            row(3, "Pendente", "19/10/2026 16:00"),
            row(4, "Green", "18/10/2026 16:00"),
            row(5, "Pendente", "talvez sexta"),
            row(6, "Pendente", "19/10/2026 17:30"),
        ];
        let selected: Vec<usize> = select_pending(&rows, now, ChronoDuration::minutes(150))
            .iter()
            .map(|r| r.row_number)
            .collect();
        assert_eq!(selected, vec![3, 6]);
    }

    #[test]
    fn test_review_cell() {
        assert_eq!(review_cell("MatchNotFound"), "Revisão (MatchNotFound)");
        assert_eq!(BetStatus::from_cell(&review_cell("TeamNotFound")), Some(BetStatus::NeedsReview));
    }
}
