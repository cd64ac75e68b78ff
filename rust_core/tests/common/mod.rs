//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tipsheet_core::clients::{CompletionClient, FixtureProvider, PromptPart};
use tipsheet_core::extraction::{ContextLists, ExtractionValidator, PromptSet};
use tipsheet_core::matching::MatchResolver;
use tipsheet_core::models::{Fixture, TeamInfo, TeamRef};
use tipsheet_core::sheet::{header_row, Column, COLUMNS};
use tipsheet_core::team_cache::TeamAliasCache;
use tipsheet_core::transport::{InboundMessage, MessageTransport};

pub const CHAT_ID: i64 = -1001234567890;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// AI
// ============================================================================

/// Answers by prompt kind: name standardization echoes the name, validation
/// and extraction replies are picked by a substring of the prompt.
#[derive(Default)]
pub struct ScriptedAi {
    extraction: Mutex<Vec<(String, String)>>,
    validation: Mutex<Vec<(String, String)>>,
    pub calls: AtomicUsize,
}

impl ScriptedAi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply `reply` to extraction prompts whose message contains `needle`.
    pub fn on_message(self, needle: &str, reply: &str) -> Self {
        self.extraction
            .lock()
            .unwrap()
            .push((needle.to_string(), reply.to_string()));
        self
    }

    /// Reply `reply` to validation requests mentioning `needle`.
    pub fn on_validation(self, needle: &str, reply: &str) -> Self {
        self.validation
            .lock()
            .unwrap()
            .push((needle.to_string(), reply.to_string()));
        self
    }
}

#[async_trait]
impl CompletionClient for ScriptedAi {
    async fn complete(&self, parts: &[PromptPart]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text: String = parts
            .iter()
            .filter_map(|p| match p {
                PromptPart::Text(t) => Some(t.as_str()),
                PromptPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(idx) = text.find("Name to convert:") {
            let name = text[idx + "Name to convert:".len()..].trim().trim_matches('\'');
            return Ok(name.to_string());
        }
        if text.contains("original_tip") {
            return self
                .validation
                .lock()
                .unwrap()
                .iter()
                .find(|(needle, _)| text.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
                .ok_or_else(|| anyhow!("validation unavailable"));
        }
        let message = text
            .rsplit("Now analyze the following message:")
            .next()
            .unwrap_or_default();
        self.extraction
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| message.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| anyhow!("no scripted reply"))
    }
}

pub fn new_bet_reply(matches: &str, entry: &str, event: &str, sport: &str) -> String {
    serde_json::json!({
        "message_type": "new_bet",
        "data": {
            "house": "Bet365",
            "bet_type": "Simples",
            "sport": sport,
            "match": matches,
            "description": "Resultado final",
            "entry": entry,
            "odds": "1.85",
            "stake_unit": "1u",
            "event_datetime": event
        }
    })
    .to_string()
}

pub fn validation_reply(home: &str, away: &str, date: &str, time: &str) -> String {
    serde_json::json!({
        "match_found": true,
        "home_team": home,
        "away_team": away,
        "date": date,
        "time": time
    })
    .to_string()
}

// ============================================================================
// Fixture provider
// ============================================================================

#[derive(Default)]
pub struct FakeProvider {
    teams: HashMap<String, TeamInfo>,
    fixtures: Vec<(NaiveDate, Fixture)>,
    pub failing: AtomicBool,
    pub team_searches: AtomicUsize,
    pub fixture_searches: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(mut self, id: u32, name: &str) -> Self {
        self.teams.insert(
            name.to_lowercase(),
            TeamInfo {
                id,
                name: name.to_string(),
                country: None,
            },
        );
        self
    }

    pub fn fixture(mut self, on: NaiveDate, fixture: Fixture) -> Self {
        self.fixtures.push((on, fixture));
        self
    }
}

pub fn finished_fixture(id: u64, home: (u32, &str), away: (u32, &str), score: (u32, u32)) -> Fixture {
    Fixture {
        fixture_id: id,
        kickoff: None,
        status_short: "FT".to_string(),
        home: TeamRef {
            id: home.0,
            name: home.1.to_string(),
        },
        away: TeamRef {
            id: away.0,
            name: away.1.to_string(),
        },
        home_goals: Some(score.0),
        away_goals: Some(score.1),
    }
}

#[async_trait]
impl FixtureProvider for FakeProvider {
    async fn search_teams(&self, name: &str) -> Result<Vec<TeamInfo>> {
        self.team_searches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("timed out"));
        }
        Ok(self.teams.get(&name.to_lowercase()).cloned().into_iter().collect())
    }

    async fn search_fixtures(&self, date: NaiveDate, team_id: u32) -> Result<Vec<Fixture>> {
        self.fixture_searches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("timed out"));
        }
        Ok(self
            .fixtures
            .iter()
            .filter(|(on, f)| *on == date && (f.home.id == team_id || f.away.id == team_id))
            .map(|(_, f)| f.clone())
            .collect())
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
pub struct FakeTransport {
    messages: Mutex<HashMap<(i64, i64), InboundMessage>>,
    channels: Vec<(i64, String)>,
}

impl FakeTransport {
    pub fn new(channels: &[(i64, &str)]) -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            channels: channels.iter().map(|(id, t)| (*id, t.to_string())).collect(),
        }
    }

    pub fn with_message(self, message: InboundMessage) -> Self {
        self.messages
            .lock()
            .unwrap()
            .insert((message.chat_id, message.message_id), message);
        self
    }
}

pub fn message(chat_id: i64, message_id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id,
        message_id,
        text: text.to_string(),
        date: Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
        has_photo: false,
        media: None,
        chat_title: None,
    }
}

#[async_trait]
impl MessageTransport for FakeTransport {
    async fn get_message_by_id(&self, chat_id: i64, message_id: i64) -> Result<Option<InboundMessage>> {
        Ok(self.messages.lock().unwrap().get(&(chat_id, message_id)).cloned())
    }

    async fn search_messages(&self, chat_id: i64, query: &str, limit: usize) -> Result<Vec<InboundMessage>> {
        let query = query.to_lowercase();
        let mut hits: Vec<InboundMessage> = self
            .messages
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.chat_id == chat_id)
            .filter(|m| {
                let text = m.text.to_lowercase();
                query.split_whitespace().all(|w| text.contains(w))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.message_id.cmp(&a.message_id));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn download_media(&self, _message: &InboundMessage) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn channel_title(&self, chat_id: i64) -> Result<Option<String>> {
        Ok(self
            .channels
            .iter()
            .find(|(id, _)| *id == chat_id)
            .map(|(_, t)| t.clone()))
    }

    async fn channels(&self) -> Result<Vec<(i64, String)>> {
        Ok(self.channels.clone())
    }

    async fn subscribe(&self, _chat_id: i64) -> Result<()> {
        Ok(())
    }

    async fn unsubscribe(&self, _chat_id: i64) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Wiring and rows
// ============================================================================

pub fn prompts() -> PromptSet {
    PromptSet {
        extraction: "Classify the post and extract the tip as JSON.".to_string(),
        validation: "Confirm the fixture.\n{initial_data_json}".to_string(),
    }
}

pub fn resolver(provider: Arc<FakeProvider>, ai: Arc<ScriptedAi>) -> Arc<MatchResolver> {
    Arc::new(MatchResolver::new(provider, ai, Arc::new(TeamAliasCache::new())))
}

pub fn pipeline(provider: Arc<FakeProvider>, ai: Arc<ScriptedAi>) -> Arc<ExtractionValidator> {
    let resolver = resolver(provider, ai.clone());
    Arc::new(ExtractionValidator::new(ai, resolver, prompts(), ContextLists::default()))
}

/// A full data row; unspecified columns are empty.
pub fn bet_row(values: &[(Column, &str)]) -> Vec<String> {
    let mut cells = vec![String::new(); COLUMNS.len()];
    for (column, value) in values {
        cells[column.index()] = value.to_string();
    }
    cells
}

pub fn with_header(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut all = vec![header_row()];
    all.extend(rows);
    all
}

pub fn cell(row: &[String], column: Column) -> &str {
    row.get(column.index()).map(|s| s.as_str()).unwrap_or("")
}
