//! Text/vision completion over the Gemini `generateContent` REST endpoint.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Image(Vec<u8>),
}

impl PromptPart {
    pub fn text(value: impl Into<String>) -> Self {
        PromptPart::Text(value.into())
    }
}

/// Black-box AI completion: prompt parts in, free text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, parts: &[PromptPart]) -> Result<String>;
}

/// Best-effort MIME type from magic bytes; channel photos are usually JPEG.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: &str, model: Option<&str>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.to_string(),
            model: model.unwrap_or(DEFAULT_GEMINI_MODEL).to_string(),
        }
    }

    fn request_body(parts: &[PromptPart]) -> Value {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => json!({ "text": text }),
                PromptPart::Image(bytes) => json!({
                    "inline_data": {
                        "mime_type": sniff_image_mime(bytes),
                        "data": BASE64.encode(bytes),
                    }
                }),
            })
            .collect();
        json!({ "contents": [{ "role": "user", "parts": parts }] })
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_response(data: &Value) -> Result<String> {
        if let Some(message) = data["error"]["message"].as_str() {
            return Err(anyhow!("Gemini error: {}", message));
        }
        let parts = data["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| anyhow!("Gemini response has no candidate parts"))?;
        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(anyhow!("Gemini returned an empty completion"));
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, parts: &[PromptPart]) -> Result<String> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        debug!(model = %self.model, parts = parts.len(), "Gemini request");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(parts))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let data: Value = resp.json().await.context("Gemini response is not JSON")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Gemini returned status {}: {}",
                status.as_u16(),
                data["error"]["message"].as_str().unwrap_or("unknown error")
            ));
        }
        Self::parse_response(&data)
    }
}
