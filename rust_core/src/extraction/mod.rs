//! AI-assisted extraction of tips from channel posts, followed by an
//! independent validation pass and fixture lookup.
//!
//! The pipeline is linear: extract, guard, validate, merge. It never returns
//! an error; every failure degrades to a status tag plus a best-effort payload.

pub mod prompts;

use chrono::NaiveDateTime;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::gemini::{CompletionClient, PromptPart};
use crate::clients::sofascore::TeamContextLookup;
use crate::clients::tavily::WebSearch;
use crate::error::{ExtractionError, ResolveError};
use crate::matching::{split_teams, MatchResolver};
use crate::models::{BetPayload, ExtractionResult, TeamIdField, ValidationResult};
use crate::utils::dates::format_event_datetime;

pub use prompts::{ContextLists, PromptSet};

const NO_TEAM_CONTEXT: &str = "No additional context found.";

/// Everything the pipeline needs to know about one post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostContent {
    pub message_id: i64,
    pub text: String,
    pub image: Option<Vec<u8>>,
    pub channel_name: String,
    /// Local posting time, the anchor for relative dates.
    pub posted_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Success,
    Ignored,
    ProcessingError,
}

/// What happened to the fixture lookup of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Resolved { home_id: u32, away_id: u32 },
    /// Lookup attempted; IDs carry the not-found marker unless the date was unusable.
    Failed(ResolveError),
    /// Validation did not confirm the fixture; IDs left empty.
    NotValidated,
    /// Sport outside the provider's coverage; IDs left empty.
    NotFootball,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub status: ProcessStatus,
    pub payload: Option<BetPayload>,
    pub lookup: Option<LookupOutcome>,
    /// Classification label or error text for non-success outcomes.
    pub reason: Option<String>,
}

impl ProcessOutcome {
    fn success(payload: BetPayload, lookup: LookupOutcome) -> Self {
        Self {
            status: ProcessStatus::Success,
            payload: Some(payload),
            lookup: Some(lookup),
            reason: None,
        }
    }

    fn ignored(label: String) -> Self {
        Self {
            status: ProcessStatus::Ignored,
            payload: None,
            lookup: None,
            reason: Some(label),
        }
    }

    fn error(reason: String) -> Self {
        Self {
            status: ProcessStatus::ProcessingError,
            payload: None,
            lookup: None,
            reason: Some(reason),
        }
    }
}

pub struct ExtractionValidator {
    ai: Arc<dyn CompletionClient>,
    resolver: Arc<MatchResolver>,
    prompts: PromptSet,
    context: ContextLists,
    web_search: Option<Arc<dyn WebSearch>>,
    team_context: Option<Arc<dyn TeamContextLookup>>,
}

impl ExtractionValidator {
    pub fn new(
        ai: Arc<dyn CompletionClient>,
        resolver: Arc<MatchResolver>,
        prompts: PromptSet,
        context: ContextLists,
    ) -> Self {
        Self {
            ai,
            resolver,
            prompts,
            context,
            web_search: None,
            team_context: None,
        }
    }

    pub fn with_web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(search);
        self
    }

    pub fn with_team_context(mut self, lookup: Arc<dyn TeamContextLookup>) -> Self {
        self.team_context = Some(lookup);
        self
    }

    /// First AI pass: classify the post and pull out structured fields.
    pub async fn extract(&self, post: &PostContent) -> ExtractionResult {
        let body = if post.text.trim().is_empty() {
            "Message without text."
        } else {
            post.text.as_str()
        };
        let mut parts = vec![
            PromptPart::text(self.prompts.extraction.clone()),
            PromptPart::Text(self.context.prompt_block(&post.channel_name)),
            PromptPart::Text(format!("\n\nNow analyze the following message:\n{}", body)),
        ];
        if let Some(image) = &post.image {
            parts.push(PromptPart::Image(image.clone()));
        }

        match self.ai.complete(&parts).await {
            Ok(reply) => {
                let result = ExtractionResult::parse(&reply);
                if let ExtractionResult::Error { reason } = &result {
                    warn!(message_id = post.message_id, "Extraction reply rejected: {}", reason);
                    debug!(message_id = post.message_id, reply = %reply, "Rejected reply");
                }
                result
            }
            Err(e) => ExtractionResult::Error {
                reason: ExtractionError::Service(format!("{:#}", e)),
            },
        }
    }

    async fn validation_request(&self, payload: &BetPayload, primary: &str, posted_at: NaiveDateTime) -> Value {
        let mut request = json!({
            "original_tip": {
                "match": primary,
                "description": payload.bet_description,
                "entry": payload.entry_description,
                "event_datetime": payload.event_datetime,
            },
            "posted_at": format_event_datetime(&posted_at),
        });

        if let Some(lookup) = &self.team_context {
            let first_team = split_teams(primary).map(|(home, _)| home).unwrap_or_else(|| primary.to_string());
            request["team_context"] = lookup
                .team_context(&first_team)
                .await
                .unwrap_or_else(|| Value::String(NO_TEAM_CONTEXT.to_string()));
        }

        if let Some(search) = &self.web_search {
            let query = format!("{} {}", primary, posted_at.format("%d/%m/%Y"));
            match search.search(&query).await {
                Ok(snippets) if !snippets.is_empty() => {
                    request["web_results"] = Value::String(snippets);
                }
                Ok(_) => {}
                Err(e) => warn!("Web search for '{}' failed: {:#}", query, e),
            }
        }
        request
    }

    /// Second AI pass: confirm or correct team names and kickoff.
    ///
    /// Any failure is reported as "not found".
    pub async fn validate(&self, payload: &BetPayload, posted_at: NaiveDateTime) -> ValidationResult {
        let Some(primary) = payload.primary_match() else {
            return ValidationResult::not_found();
        };
        let request = self.validation_request(payload, primary, posted_at).await;
        let request_json = serde_json::to_string_pretty(&request).unwrap_or_else(|_| request.to_string());
        let prompt = self.prompts.render_validation(&request_json);

        match self.ai.complete(&[PromptPart::Text(prompt)]).await {
            Ok(reply) => ValidationResult::parse(&reply).unwrap_or_else(|e| {
                warn!("Validation reply rejected for '{}': {}", primary, e);
                ValidationResult::not_found()
            }),
            Err(e) => {
                warn!("Validation call failed for '{}': {:#}", primary, e);
                ValidationResult::not_found()
            }
        }
    }

    /// Full pipeline for one post.
    pub async fn process(&self, post: &PostContent) -> ProcessOutcome {
        let mut payload = match self.extract(post).await {
            ExtractionResult::NewBet(payload) => payload,
            ExtractionResult::Other { label } => {
                info!(message_id = post.message_id, "Classified as '{}', ignoring", label);
                return ProcessOutcome::ignored(label);
            }
            ExtractionResult::Error { reason } => {
                warn!(message_id = post.message_id, reason = %reason, "Extraction failed");
                return ProcessOutcome::error(reason.to_string());
            }
        };

        if payload.tipster.is_none() {
            payload.tipster = Some(post.channel_name.clone());
        }

        if payload.primary_match().is_none() {
            warn!(message_id = post.message_id, "New bet without match description");
            return ProcessOutcome::error("missing match description".to_string());
        }

        if !payload.is_football() {
            debug!(message_id = post.message_id, sport = ?payload.sport, "Skipping lookup for non-football tip");
            payload.home_team_id = TeamIdField::Empty;
            payload.away_team_id = TeamIdField::Empty;
            return ProcessOutcome::success(payload, LookupOutcome::NotFootball);
        }

        let validation = self.validate(&payload, post.posted_at).await;
        let (Some(description), Some(datetime)) =
            (validation.canonical_description(), validation.canonical_datetime())
        else {
            warn!(message_id = post.message_id, "Validation did not confirm the fixture, keeping extracted data");
            payload.home_team_id = TeamIdField::Empty;
            payload.away_team_id = TeamIdField::Empty;
            return ProcessOutcome::success(payload, LookupOutcome::NotValidated);
        };

        info!(message_id = post.message_id, "Validated as '{}' at {}", description, datetime);
        let extracted_datetime = payload.event_datetime.replace(datetime.clone());
        payload.match_description = Some(description.clone());

        let lookup = match self.resolver.resolve_by_name(&description, &datetime).await {
            Ok(fixture) => {
                info!(
                    message_id = post.message_id,
                    home_id = fixture.home.id,
                    away_id = fixture.away.id,
                    "Fixture resolved"
                );
                payload.home_team_id = TeamIdField::Id(fixture.home.id);
                payload.away_team_id = TeamIdField::Id(fixture.away.id);
                LookupOutcome::Resolved {
                    home_id: fixture.home.id,
                    away_id: fixture.away.id,
                }
            }
            Err(err @ ResolveError::InvalidDate(_)) => {
                warn!(message_id = post.message_id, reason = err.code(), "Unusable event date, keeping extracted date");
                payload.event_datetime = extracted_datetime;
                payload.home_team_id = TeamIdField::Empty;
                payload.away_team_id = TeamIdField::Empty;
                LookupOutcome::Failed(err)
            }
            Err(err) => {
                warn!(message_id = post.message_id, reason = err.code(), "Fixture lookup failed: {}", err);
                payload.home_team_id = TeamIdField::NotFound;
                payload.away_team_id = TeamIdField::NotFound;
                LookupOutcome::Failed(err)
            }
        };

        ProcessOutcome::success(payload, lookup)
    }
}
