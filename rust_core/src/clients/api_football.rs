//! API-Football v3 client: team search and fixtures by date and team.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::models::{Fixture, TeamInfo, TeamRef};

const API_FOOTBALL_BASE_URL: &str = "https://v3.football.api-sports.io/";
const API_FOOTBALL_HOST: &str = "v3.football.api-sports.io";

/// Read-only sports-data provider.
#[async_trait]
pub trait FixtureProvider: Send + Sync {
    /// Teams matching a search term, in provider order.
    async fn search_teams(&self, name: &str) -> Result<Vec<TeamInfo>>;

    /// Fixtures involving `team_id` on `date`.
    async fn search_fixtures(&self, date: NaiveDate, team_id: u32) -> Result<Vec<Fixture>>;
}

#[derive(Clone)]
pub struct ApiFootballClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for ApiFootballClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiFootballClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiFootballClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, API_FOOTBALL_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?params, "API-Football request");
        let resp = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", API_FOOTBALL_HOST)
            .query(params)
            .send()
            .await
            .with_context(|| format!("API-Football request to {} failed", path))?
            .error_for_status()
            .with_context(|| format!("API-Football returned an error for {}", path))?;
        let data: Value = resp.json().await.context("API-Football response is not JSON")?;

        // Quota and auth problems come back as 200 with a populated `errors`.
        if let Some(errors) = data["errors"].as_object() {
            if !errors.is_empty() {
                return Err(anyhow!("API-Football errors: {}", Value::Object(errors.clone())));
            }
        }
        Ok(data)
    }
}

fn parse_team(entry: &Value) -> Option<TeamInfo> {
    let team = &entry["team"];
    Some(TeamInfo {
        id: u32::try_from(team["id"].as_u64()?).ok()?,
        name: team["name"].as_str()?.to_string(),
        country: team["country"].as_str().map(str::to_string),
    })
}

fn parse_team_ref(team: &Value) -> Option<TeamRef> {
    Some(TeamRef {
        id: u32::try_from(team["id"].as_u64()?).ok()?,
        name: team["name"].as_str().unwrap_or_default().to_string(),
    })
}

fn goals(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|g| u32::try_from(g).ok())
}

/// Regulation-time score; `goals` also counts extra time, so it is only a
/// fallback for entries without `score.fulltime`.
fn fulltime_score(entry: &Value) -> (Option<u32>, Option<u32>) {
    let fulltime = &entry["score"]["fulltime"];
    match (goals(&fulltime["home"]), goals(&fulltime["away"])) {
        (Some(home), Some(away)) => (Some(home), Some(away)),
        _ => (goals(&entry["goals"]["home"]), goals(&entry["goals"]["away"])),
    }
}

pub(crate) fn parse_fixture(entry: &Value) -> Option<Fixture> {
    let (home_goals, away_goals) = fulltime_score(entry);
    Some(Fixture {
        fixture_id: entry["fixture"]["id"].as_u64()?,
        kickoff: entry["fixture"]["date"].as_str().map(str::to_string),
        status_short: entry["fixture"]["status"]["short"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        home: parse_team_ref(&entry["teams"]["home"])?,
        away: parse_team_ref(&entry["teams"]["away"])?,
        home_goals,
        away_goals,
    })
}

fn response_items(data: &Value) -> &[Value] {
    data["response"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

#[async_trait]
impl FixtureProvider for ApiFootballClient {
    async fn search_teams(&self, name: &str) -> Result<Vec<TeamInfo>> {
        let data = self.get("teams", &[("search", name.to_string())]).await?;
        Ok(response_items(&data).iter().filter_map(parse_team).collect())
    }

    async fn search_fixtures(&self, date: NaiveDate, team_id: u32) -> Result<Vec<Fixture>> {
        let params = [
            ("date", date.format("%Y-%m-%d").to_string()),
            ("team", team_id.to_string()),
        ];
        let data = self.get("fixtures", &params).await?;
        Ok(response_items(&data).iter().filter_map(parse_fixture).collect())
    }
}
