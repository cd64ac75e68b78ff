//! Auxiliary team context from the public Sofascore search endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

const SOFASCORE_SEARCH_URL: &str = "https://api.sofascore.com/api/v1/search/all";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Hint source for validation prompts. `None` means "no extra context".
#[async_trait]
pub trait TeamContextLookup: Send + Sync {
    async fn team_context(&self, query: &str) -> Option<Value>;
}

/// First search hit of type `team`.
pub fn first_team_entity(data: &Value) -> Option<Value> {
    data["results"]
        .as_array()?
        .iter()
        .find(|r| r["type"].as_str() == Some("team") && r["entity"].is_object())
        .map(|r| r["entity"].clone())
}

#[derive(Clone)]
pub struct SofascoreClient {
    client: Client,
}

impl Default for SofascoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SofascoreClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(BROWSER_USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    async fn search(&self, query: &str) -> Result<Value> {
        self.client
            .get(SOFASCORE_SEARCH_URL)
            .query(&[("q", query)])
            .send()
            .await
            .context("Sofascore request failed")?
            .error_for_status()
            .context("Sofascore returned an error")?
            .json()
            .await
            .context("Sofascore response is not JSON")
    }
}

#[async_trait]
impl TeamContextLookup for SofascoreClient {
    async fn team_context(&self, query: &str) -> Option<Value> {
        if query.trim().is_empty() {
            return None;
        }
        match self.search(query).await {
            Ok(data) => {
                let entity = first_team_entity(&data);
                if let Some(name) = entity.as_ref().and_then(|e| e["name"].as_str()) {
                    info!("[Sofascore] Found: {}", name);
                }
                entity
            }
            Err(e) => {
                warn!("[Sofascore] Search for '{}' failed: {:#}", query, e);
                None
            }
        }
    }
}
