//! Web search grounding through the Tavily search API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: usize = 5;

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked snippets, one per line, ready to paste into a prompt.
    async fn search(&self, query: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

fn format_results(results: &[TavilyResult]) -> String {
    results
        .iter()
        .take(MAX_RESULTS)
        .map(|r| format!("Título: {}, URL: {}, Conteúdo: {}", r.title, r.url, r.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str) -> Result<String> {
        info!("[Tavily] Searching: '{}'", query);
        let resp: TavilyResponse = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "search_depth": "basic",
                "max_results": MAX_RESULTS,
            }))
            .send()
            .await
            .context("Tavily request failed")?
            .error_for_status()
            .context("Tavily returned an error")?
            .json()
            .await
            .context("Tavily response is not valid JSON")?;
        info!("[Tavily] {} results", resp.results.len());
        Ok(format_results(&resp.results))
    }
}
