//! Fixture lookup: exact by team IDs, or by free-text "Home x Away" names.

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::normalizer::{clean_name, NameNormalizer, NormalizedName};
use crate::clients::api_football::FixtureProvider;
use crate::clients::gemini::CompletionClient;
use crate::error::ResolveError;
use crate::models::Fixture;
use crate::team_cache::{AliasEntry, AliasStore};
use crate::utils::dates::parse_event_datetime;

/// Tried in order; the first one present splits the description.
pub const TEAM_SEPARATORS: [&str; 4] = [" x ", " vs ", " v ", " - "];

/// Placeholder names tipsters use when the opponent is unknown.
pub const IGNORED_TEAM_NAMES: [&str; 7] =
    ["adversário", "oponente", "time a", "time b", "?", "", "none"];

fn separator_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        TEAM_SEPARATORS
            .iter()
            .map(|sep| Regex::new(&format!("(?i){}", regex::escape(sep))).expect("static regex"))
            .collect()
    })
}

/// Split "Home x Away" into two trimmed names.
pub fn split_teams(description: &str) -> Option<(String, String)> {
    for re in separator_res() {
        if re.is_match(description) {
            let mut parts = re.splitn(description, 2);
            let home = parts.next()?.trim().to_string();
            let away = parts.next()?.trim().to_string();
            return Some((home, away));
        }
    }
    None
}

pub struct MatchResolver {
    provider: Arc<dyn FixtureProvider>,
    normalizer: NameNormalizer,
    aliases: Arc<dyn AliasStore>,
}

impl MatchResolver {
    pub fn new(
        provider: Arc<dyn FixtureProvider>,
        ai: Arc<dyn CompletionClient>,
        aliases: Arc<dyn AliasStore>,
    ) -> Self {
        Self {
            provider,
            normalizer: NameNormalizer::new(ai, aliases.clone()),
            aliases,
        }
    }

    fn parse_date(event_date: &str, now: NaiveDateTime) -> Result<NaiveDate, ResolveError> {
        parse_event_datetime(event_date, now)
            .map(|dt| dt.date())
            .ok_or_else(|| ResolveError::InvalidDate(event_date.to_string()))
    }

    /// One provider query for the home team on that day, then scan for the away team.
    pub async fn resolve_by_ids(
        &self,
        home_id: u32,
        away_id: u32,
        event_date: &str,
    ) -> Result<Fixture, ResolveError> {
        let date = Self::parse_date(event_date, Local::now().naive_local())?;
        self.resolve_by_ids_on(home_id, away_id, date).await
    }

    async fn resolve_by_ids_on(
        &self,
        home_id: u32,
        away_id: u32,
        date: NaiveDate,
    ) -> Result<Fixture, ResolveError> {
        if home_id == 0 || away_id == 0 {
            return Err(ResolveError::TeamNotFound(format!("{}/{}", home_id, away_id)));
        }

        let fixtures = self
            .provider
            .search_fixtures(date, home_id)
            .await
            .map_err(|e| ResolveError::ApiError(format!("{:#}", e)))?;

        fixtures
            .into_iter()
            .find(|f| f.away.id == away_id)
            .ok_or_else(|| ResolveError::MatchNotFound {
                home_id,
                away_id,
                date: date.format("%Y-%m-%d").to_string(),
            })
    }

    /// Split, resolve both names to IDs, then delegate to the ID lookup.
    ///
    /// The date is checked before any team search so an unusable date costs no
    /// provider calls.
    pub async fn resolve_by_name(
        &self,
        event_description: &str,
        event_date: &str,
    ) -> Result<Fixture, ResolveError> {
        if event_description.trim().is_empty() {
            return Err(ResolveError::InvalidDescription);
        }
        let date = Self::parse_date(event_date, Local::now().naive_local())?;
        let (home, away) = split_teams(event_description)
            .ok_or_else(|| ResolveError::ParseError(event_description.to_string()))?;

        let home_id = self.team_id(&home).await?;
        let away_id = self.team_id(&away).await?;
        debug!(home = %home, home_id, away = %away, away_id, "Resolved team IDs");

        self.resolve_by_ids_on(home_id, away_id, date).await
    }

    /// Cache first, then AI-standardized provider search. The first search hit wins.
    pub async fn team_id(&self, raw_name: &str) -> Result<u32, ResolveError> {
        let cleaned = clean_name(raw_name);
        if IGNORED_TEAM_NAMES.contains(&cleaned.as_str()) {
            return Err(ResolveError::TeamNotFound(raw_name.to_string()));
        }

        let (cleaned, search_key) = match self.normalizer.normalize(&cleaned).await {
            NormalizedName::Cached { entry: AliasEntry::Id(id), .. } => return Ok(id),
            NormalizedName::Cached { entry: AliasEntry::NotFound, .. } => {
                return Err(ResolveError::TeamNotFound(raw_name.to_string()))
            }
            NormalizedName::Search { cleaned, search_key } => (cleaned, search_key),
        };

        let teams = self
            .provider
            .search_teams(&search_key)
            .await
            .map_err(|e| ResolveError::ApiError(format!("{:#}", e)))?;

        match teams.into_iter().next() {
            Some(team) => {
                info!(
                    "Team '{}' searched as '{}' -> {} ({})",
                    cleaned, search_key, team.name, team.id
                );
                self.aliases.put(&cleaned, AliasEntry::Id(team.id)).await;
                self.aliases.put(&search_key, AliasEntry::Id(team.id)).await;
                self.aliases.put(&clean_name(&team.name), AliasEntry::Id(team.id)).await;
                Ok(team.id)
            }
            None => {
                warn!("No provider team for '{}' (searched '{}')", cleaned, search_key);
                self.aliases.put(&cleaned, AliasEntry::NotFound).await;
                Err(ResolveError::TeamNotFound(raw_name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_teams() {
        assert_eq!(
            split_teams("Flamengo x Palmeiras"),
            Some(("Flamengo".to_string(), "Palmeiras".to_string()))
        );
        assert_eq!(
            split_teams("Real Madrid VS Barcelona"),
            Some(("Real Madrid".to_string(), "Barcelona".to_string()))
        );
        assert_eq!(
            split_teams("Arsenal v Chelsea"),
            Some(("Arsenal".to_string(), "Chelsea".to_string()))
        );
        assert_eq!(
            split_teams("Grêmio - Internacional"),
            Some(("Grêmio".to_string(), "Internacional".to_string()))
        );
        assert_eq!(split_teams("Flamengo"), None);
    }

    #[test]
    fn test_separator_priority() {
        // " x " wins over " - " when both are present.
        assert_eq!(
            split_teams("Atlético - MG x Bahia"),
            Some(("Atlético - MG".to_string(), "Bahia".to_string()))
        );
    }

    #[test]
    fn test_ignore_list_is_clean() {
        for name in IGNORED_TEAM_NAMES {
            assert_eq!(clean_name(name), name);
        }
    }
}
