//! Team-name normalization: local cleaning plus AI standardization into a
//! provider-friendly search term.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::clients::gemini::{CompletionClient, PromptPart};
use crate::team_cache::{AliasEntry, AliasStore};

const STANDARDIZE_PROMPT: &str = "\
Convert football team names written by Brazilian tipsters into a short, \
standardized English search term for a sports-data API.
Rules:
1. Translate country names into English (e.g. 'equador' -> 'ecuador').
2. Abbreviate 'sub-21', 'sub 21' and similar to 'u21'.
3. Abbreviate 'women', 'feminino', 'w', '[w]' and '(f)' to 'w'.
4. Keep the rest of the name as clean and direct as possible.
5. Answer ONLY with the formatted name.
Examples:
- 'espanha w' -> spain w
- 'inglaterra sub21 feminino' -> england u21 w
- 'américa-mg' -> america mineiro
Name to convert: ";

fn gender_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*\[(w|f)\]|\s*\((w|f)\)").expect("static regex"))
}

/// Lowercase, trim, and rewrite `[W]`/`(F)` style markers to a trailing ` w`.
pub fn clean_name(raw: &str) -> String {
    let replaced = gender_marker_re().replace_all(raw, " w");
    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Result of normalizing one raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedName {
    /// The cleaned name is already in the alias cache.
    Cached { key: String, entry: AliasEntry },
    /// Needs a provider search with `search_key`.
    Search { cleaned: String, search_key: String },
}

impl NormalizedName {
    pub fn key(&self) -> &str {
        match self {
            NormalizedName::Cached { key, .. } => key,
            NormalizedName::Search { search_key, .. } => search_key,
        }
    }
}

pub struct NameNormalizer {
    ai: Arc<dyn CompletionClient>,
    aliases: Arc<dyn AliasStore>,
}

impl NameNormalizer {
    pub fn new(ai: Arc<dyn CompletionClient>, aliases: Arc<dyn AliasStore>) -> Self {
        Self { ai, aliases }
    }

    pub async fn normalize(&self, raw_name: &str) -> NormalizedName {
        let cleaned = clean_name(raw_name);
        if let Some(entry) = self.aliases.get(&cleaned).await {
            return NormalizedName::Cached { key: cleaned, entry };
        }

        let search_key = self.standardize(&cleaned).await;
        debug!(raw = raw_name, cleaned = %cleaned, search_key = %search_key, "Normalized team name");
        NormalizedName::Search { cleaned, search_key }
    }

    /// Ask the AI for a search term; any failure falls back to the cleaned name.
    async fn standardize(&self, cleaned: &str) -> String {
        let prompt = format!("{}'{}'", STANDARDIZE_PROMPT, cleaned);
        match self.ai.complete(&[PromptPart::Text(prompt)]).await {
            Ok(reply) => {
                let line = reply
                    .lines()
                    .map(|l| l.trim().trim_matches(|c| c == '\'' || c == '"' || c == '`'))
                    .find(|l| !l.is_empty())
                    .unwrap_or_default();
                let standardized = clean_name(line);
                if standardized.is_empty() {
                    cleaned.to_string()
                } else {
                    standardized
                }
            }
            Err(e) => {
                warn!("AI standardization failed for '{}': {:#}", cleaned, e);
                cleaned.to_string()
            }
        }
    }
}
