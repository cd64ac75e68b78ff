//! Tabular row store: the trait, an in-memory store, and typed bet-table helpers.

pub mod layout;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::BetRecord;
pub use layout::{header_row, Column, StoredRow, COLUMNS};

/// One cell write addressed by 1-based row number.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub row_number: usize,
    pub column: Column,
    pub value: String,
}

/// Spreadsheet-like store. Row numbers are 1-based; row 1 is the header.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Create the table if it does not exist yet.
    async fn ensure_table(&self, table: &str) -> Result<()>;

    /// All rows, header included. Trailing empty cells may be omitted.
    async fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>>;

    async fn append_rows(&self, table: &str, rows: Vec<Vec<String>>) -> Result<()>;

    /// Overwrite a whole row in place.
    async fn write_row(&self, table: &str, row_number: usize, cells: Vec<String>) -> Result<()>;

    async fn batch_update(&self, table: &str, updates: &[CellUpdate]) -> Result<()>;

    /// Remove one row; rows below shift up.
    async fn delete_row(&self, table: &str, row_number: usize) -> Result<()>;
}

// ============================================================================
// Typed helpers
// ============================================================================

/// Rewrite row 1 when it no longer matches the fixed layout.
pub async fn ensure_header(store: &dyn RowStore, table: &str) -> Result<()> {
    store.ensure_table(table).await?;
    let rows = store.read_all(table).await?;
    let expected = header_row();
    match rows.first() {
        Some(first) if first.iter().take(expected.len()).eq(expected.iter()) => Ok(()),
        Some(_) => {
            warn!(table, "Header drifted from the column layout, repairing");
            store.write_row(table, 1, expected).await
        }
        None => {
            info!(table, "Writing header to empty table");
            store.append_rows(table, vec![expected]).await
        }
    }
}

/// Snapshot the data rows of a table, skipping the header and blank rows.
pub async fn read_bet_rows(store: &dyn RowStore, table: &str) -> Result<Vec<StoredRow>> {
    let rows = store.read_all(table).await?;
    Ok(rows
        .into_iter()
        .enumerate()
        .skip(1)
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(idx, cells)| StoredRow::new(idx + 1, cells))
        .collect())
}

pub async fn append_record(store: &dyn RowStore, table: &str, record: &BetRecord) -> Result<()> {
    ensure_header(store, table).await?;
    store.append_rows(table, vec![record.to_row()]).await
}

// ============================================================================
// In-memory store
// ============================================================================

/// Row store kept in process memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    tables: Mutex<HashMap<String, Vec<Vec<String>>>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with rows, header included.
    pub async fn seed(&self, table: &str, rows: Vec<Vec<String>>) {
        self.tables.lock().await.insert(table.to_string(), rows);
    }

    pub async fn table(&self, table: &str) -> Option<Vec<Vec<String>>> {
        self.tables.lock().await.get(table).cloned()
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn ensure_table(&self, table: &str) -> Result<()> {
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| anyhow!("table not found: {}", table))
    }

    async fn append_rows(&self, table: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table not found: {}", table))?;
        target.extend(rows);
        Ok(())
    }

    async fn write_row(&self, table: &str, row_number: usize, cells: Vec<String>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table not found: {}", table))?;
        if row_number == 0 {
            return Err(anyhow!("row numbers start at 1"));
        }
        if target.len() < row_number {
            target.resize(row_number, Vec::new());
        }
        target[row_number - 1] = cells;
        Ok(())
    }

    async fn batch_update(&self, table: &str, updates: &[CellUpdate]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table not found: {}", table))?;
        for update in updates {
            let row = target
                .get_mut(update.row_number.wrapping_sub(1))
                .ok_or_else(|| anyhow!("row {} out of range", update.row_number))?;
            let idx = update.column.index();
            if row.len() <= idx {
                row.resize(idx + 1, String::new());
            }
            row[idx] = update.value.clone();
        }
        Ok(())
    }

    async fn delete_row(&self, table: &str, row_number: usize) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table not found: {}", table))?;
        if row_number == 0 || row_number > target.len() {
            return Err(anyhow!("row {} out of range", row_number));
        }
        target.remove(row_number - 1);
        Ok(())
    }
}
