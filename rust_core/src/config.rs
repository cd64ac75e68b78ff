//! Environment configuration shared by every service, plus the wiring that
//! turns it into pipeline components.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{
    ApiFootballClient, CompletionClient, FixtureProvider, GeminiClient, GoogleSheetsStore,
    SofascoreClient, TavilyClient,
};
use crate::error::ConfigError;
use crate::extraction::{ContextLists, ExtractionValidator, PromptSet};
use crate::matching::MatchResolver;
use crate::results::ResultsConfig;
use crate::sheet::RowStore;
use crate::team_cache::{AliasStore, TeamAliasCache};

#[derive(Clone)]
pub struct Config {
    // Credentials
    pub gemini_api_key: String,
    pub gemini_model: Option<String>,
    pub api_football_key: String,
    pub spreadsheet_id: String,
    pub google_access_token: String,
    pub tavily_api_key: Option<String>,

    // Prompts and reference lists
    pub prompts: PromptSet,
    pub context: ContextLists,

    // Storage
    pub redis_url: String,
    pub database_url: String,
    pub team_mappings_path: PathBuf,
    pub channels_config_path: PathBuf,
    pub live_table: String,

    // Timing
    pub results_interval_secs: u64,
    pub results_grace_minutes: i64,
    pub provider_pause_ms: u64,
    pub channel_reload_secs: u64,

    pub sofascore_enabled: bool,
    pub audit_fallback_channel: Option<i64>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"[REDACTED]")
            .field("gemini_model", &self.gemini_model)
            .field("api_football_key", &"[REDACTED]")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("google_access_token", &"[REDACTED]")
            .field("tavily_enabled", &self.tavily_api_key.is_some())
            .field("redis_url", &self.redis_url)
            .field("database_url", &self.database_url)
            .field("team_mappings_path", &self.team_mappings_path)
            .field("channels_config_path", &self.channels_config_path)
            .field("live_table", &self.live_table)
            .field("results_interval_secs", &self.results_interval_secs)
            .field("results_grace_minutes", &self.results_grace_minutes)
            .field("provider_pause_ms", &self.provider_pause_ms)
            .field("channel_reload_secs", &self.channel_reload_secs)
            .field("sofascore_enabled", &self.sofascore_enabled)
            .field("audit_fallback_channel", &self.audit_fallback_channel)
            .finish()
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn optional(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or(var: &str, default: &str) -> String {
    optional(var).unwrap_or_else(|| default.to_string())
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

fn parse_flag(var: &'static str) -> Result<bool, ConfigError> {
    match optional(var).map(|v| v.to_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(value) => Err(ConfigError::InvalidValue { var, value }),
    }
}

impl Config {
    /// Read every knob from the environment. Call `dotenv().ok()` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        let prompts = PromptSet::load(
            &PathBuf::from(string_or("PROMPT_PATH", "prompts/main_prompt.txt")),
            &PathBuf::from(string_or("VALIDATION_PROMPT_PATH", "prompts/validation_prompt.txt")),
        )?;
        let context = ContextLists::load(&PathBuf::from(string_or("CONTEXT_DIR", "context")));

        let audit_fallback_channel = match optional("AUDIT_FALLBACK_CHANNEL_ID") {
            Some(value) => Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "AUDIT_FALLBACK_CHANNEL_ID",
                value,
            })?),
            None => None,
        };

        Ok(Self {
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL"),
            api_football_key: required("API_FOOTBALL_KEY")?,
            spreadsheet_id: required("SPREADSHEET_ID")?,
            google_access_token: required("GOOGLE_ACCESS_TOKEN")?,
            tavily_api_key: optional("TAVILY_API_KEY"),

            prompts,
            context,

            redis_url: string_or("REDIS_URL", "redis://localhost:6379"),
            database_url: string_or("DATABASE_URL", "sqlite://processed_messages.db"),
            team_mappings_path: PathBuf::from(string_or("TEAM_MAPPINGS_PATH", "team_mappings.json")),
            channels_config_path: PathBuf::from(string_or("CHANNELS_CONFIG_PATH", "config.json")),
            live_table: string_or("LIVE_SHEET_NAME", "APOSTAS"),

            results_interval_secs: parse_or("RESULTS_INTERVAL_SECS", 3600)?,
            results_grace_minutes: parse_or("RESULTS_GRACE_MINUTES", 180)?,
            provider_pause_ms: parse_or("PROVIDER_PAUSE_MS", 7000)?,
            channel_reload_secs: parse_or("CHANNEL_RELOAD_SECS", 60)?,

            sofascore_enabled: parse_flag("SOFASCORE_ENABLED")?,
            audit_fallback_channel,
        })
    }

    pub fn results_config(&self) -> ResultsConfig {
        ResultsConfig {
            live_table: self.live_table.clone(),
            grace: chrono::Duration::minutes(self.results_grace_minutes),
            provider_pause: Duration::from_millis(self.provider_pause_ms),
            interval: Duration::from_secs(self.results_interval_secs),
        }
    }

    // ========================================================================
    // Wiring
    // ========================================================================

    pub fn completion_client(&self) -> Arc<dyn CompletionClient> {
        Arc::new(GeminiClient::new(&self.gemini_api_key, self.gemini_model.as_deref()))
    }

    pub fn fixture_provider(&self) -> Arc<dyn FixtureProvider> {
        Arc::new(ApiFootballClient::new(&self.api_football_key))
    }

    pub fn row_store(&self) -> Arc<dyn RowStore> {
        Arc::new(GoogleSheetsStore::new(&self.spreadsheet_id, &self.google_access_token))
    }

    pub fn alias_store(&self) -> Arc<dyn AliasStore> {
        Arc::new(TeamAliasCache::load(&self.team_mappings_path))
    }

    pub fn resolver(&self, ai: Arc<dyn CompletionClient>, aliases: Arc<dyn AliasStore>) -> Arc<MatchResolver> {
        Arc::new(MatchResolver::new(self.fixture_provider(), ai, aliases))
    }

    /// Extraction pipeline with the optional hint sources this config enables.
    pub fn pipeline(&self, ai: Arc<dyn CompletionClient>, resolver: Arc<MatchResolver>) -> Arc<ExtractionValidator> {
        let mut pipeline = ExtractionValidator::new(ai, resolver, self.prompts.clone(), self.context.clone());
        if let Some(key) = &self.tavily_api_key {
            pipeline = pipeline.with_web_search(Arc::new(TavilyClient::new(key)));
        }
        if self.sofascore_enabled {
            pipeline = pipeline.with_team_context(Arc::new(SofascoreClient::new()));
        }
        Arc::new(pipeline)
    }
}
