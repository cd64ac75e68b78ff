//! Google Sheets v4 REST implementation of [`RowStore`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::retry::{
    execute_with_retry, execute_with_retry_when, is_retriable_error, is_unsent_error,
};
use crate::sheet::{CellUpdate, RowStore};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const MAX_ATTEMPTS: u32 = 4;

/// How far a failed write may be resent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    /// Overwrites fixed cells; sending it twice leaves the same sheet.
    Idempotent,
    /// Appends or shifts rows; resent only when it never reached the server.
    Once,
}

impl WriteKind {
    fn should_retry(self, e: &anyhow::Error) -> bool {
        match self {
            WriteKind::Idempotent => is_retriable_error(e),
            WriteKind::Once => is_unsent_error(e),
        }
    }
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range scoped to a quoted sheet title.
pub fn a1_range(table: &str, cells: &str) -> String {
    let quoted = format!("'{}'", table.replace('\'', "''"));
    if cells.is_empty() {
        quoted
    } else {
        format!("{}!{}", quoted, cells)
    }
}

pub struct GoogleSheetsStore {
    client: Client,
    spreadsheet_id: String,
    access_token: String,
    sheet_ids: Mutex<HashMap<String, i64>>,
}

impl std::fmt::Debug for GoogleSheetsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsStore")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish()
    }
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: &str, access_token: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
            sheet_ids: Mutex::new(HashMap::new()),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets base URL cannot take path segments"))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let resp = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Sheets request failed")?
            .error_for_status()
            .context("Sheets returned an error")?;
        let body = resp.text().await.context("Sheets response body unreadable")?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).context("Sheets response is not JSON")
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        execute_with_retry(|| self.send(self.client.get(url.clone())), MAX_ATTEMPTS).await
    }

    async fn post_json(&self, url: Url, body: Value, write: WriteKind) -> Result<Value> {
        execute_with_retry_when(
            || self.send(self.client.post(url.clone()).json(&body)),
            MAX_ATTEMPTS,
            |e| write.should_retry(e),
        )
        .await
    }

    async fn refresh_sheet_ids(&self) -> Result<HashMap<String, i64>> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let data = self.get_json(url).await?;
        let ids: HashMap<String, i64> = data["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| {
                        let props = &s["properties"];
                        Some((props["title"].as_str()?.to_string(), props["sheetId"].as_i64()?))
                    })
                    .collect()
            })
            .unwrap_or_default();
        *self.sheet_ids.lock().await = ids.clone();
        Ok(ids)
    }

    async fn sheet_id(&self, table: &str) -> Result<Option<i64>> {
        if let Some(id) = self.sheet_ids.lock().await.get(table) {
            return Ok(Some(*id));
        }
        Ok(self.refresh_sheet_ids().await?.get(table).copied())
    }

    /// Structural requests (addSheet, deleteDimension) are never idempotent.
    async fn spreadsheet_batch_update(&self, requests: Value) -> Result<Value> {
        // `:batchUpdate` is a suffix of the id segment, not its own segment.
        let mut url = Url::parse(SHEETS_BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets base URL cannot take path segments"))?
            .pop_if_empty()
            .push(&format!("{}:batchUpdate", self.spreadsheet_id));
        self.post_json(url, json!({ "requests": requests }), WriteKind::Once).await
    }
}

#[async_trait]
impl RowStore for GoogleSheetsStore {
    async fn ensure_table(&self, table: &str) -> Result<()> {
        if self.sheet_id(table).await?.is_some() {
            return Ok(());
        }
        info!(table, "Creating worksheet");
        self.spreadsheet_batch_update(json!([{ "addSheet": { "properties": { "title": table } } }]))
            .await?;
        self.refresh_sheet_ids().await?;
        Ok(())
    }

    async fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url(&["values", &a1_range(table, "")])?;
        let data = self.get_json(url).await?;
        let rows = data["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|c| match c {
                                        Value::String(s) => s.clone(),
                                        Value::Null => String::new(),
                                        other => other.to_string(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn append_rows(&self, table: &str, rows: Vec<Vec<String>>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut url = self.url(&["values", &format!("{}:append", a1_range(table, "A1"))])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        debug!(table, rows = rows.len(), "Appending rows");
        self.post_json(url, json!({ "values": rows }), WriteKind::Once).await?;
        Ok(())
    }

    async fn write_row(&self, table: &str, row_number: usize, cells: Vec<String>) -> Result<()> {
        let range = a1_range(table, &format!("A{}", row_number));
        let mut url = self.url(&["values", &range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        let body = json!({ "values": [cells] });
        execute_with_retry(
            || self.send(self.client.put(url.clone()).json(&body)),
            MAX_ATTEMPTS,
        )
        .await?;
        Ok(())
    }

    async fn batch_update(&self, table: &str, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let data: Vec<Value> = updates
            .iter()
            .map(|u| {
                let cell = format!("{}{}", column_letter(u.column.index()), u.row_number);
                json!({ "range": a1_range(table, &cell), "values": [[u.value]] })
            })
            .collect();
        let url = self.url(&["values:batchUpdate"])?;
        self.post_json(
            url,
            json!({ "valueInputOption": "USER_ENTERED", "data": data }),
            WriteKind::Idempotent,
        )
        .await?;
        Ok(())
    }

    async fn delete_row(&self, table: &str, row_number: usize) -> Result<()> {
        if row_number == 0 {
            return Err(anyhow!("row numbers start at 1"));
        }
        let sheet_id = self
            .sheet_id(table)
            .await?
            .ok_or_else(|| anyhow!("worksheet not found: {}", table))?;
        self.spreadsheet_batch_update(json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row_number - 1,
                    "endIndex": row_number
                }
            }
        }]))
        .await?;
        Ok(())
    }
}
