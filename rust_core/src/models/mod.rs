// Shared models for the tipsheet pipeline
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod extraction;

pub use extraction::{BetPayload, ExtractionResult, ValidationResult};

// ============================================================================
// Bet status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    Pending,
    Win,
    Loss,
    NeedsReview,
    Error,
}

impl BetStatus {
    /// Cell text written to the row store.
    pub fn as_cell(&self) -> &'static str {
        match self {
            BetStatus::Pending => "Pendente",
            BetStatus::Win => "Green",
            BetStatus::Loss => "Red",
            BetStatus::NeedsReview => "Revisão Manual",
            BetStatus::Error => "Erro",
        }
    }

    /// Parse a status cell. Unknown text is `None` and is never archived.
    pub fn from_cell(cell: &str) -> Option<Self> {
        let lower = cell.trim().to_lowercase();
        match lower.as_str() {
            "pendente" | "pending" => Some(BetStatus::Pending),
            "green" | "win" => Some(BetStatus::Win),
            "red" | "loss" => Some(BetStatus::Loss),
            "erro" | "error" => Some(BetStatus::Error),
            "needs review" | "needsreview" => Some(BetStatus::NeedsReview),
            _ if lower.starts_with("revis") => Some(BetStatus::NeedsReview),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

// ============================================================================
// Team ID cells
// ============================================================================

/// Written to the ID columns when a lookup was attempted and failed.
pub const NOT_FOUND_MARKER: &str = "NAO_ENCONTRADO_API";

/// Content of a `HomeTeamID`/`AwayTeamID` cell.
///
/// `Empty` means enrichment was skipped; `NotFound` means it was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeamIdField {
    #[default]
    Empty,
    NotFound,
    Id(u32),
}

impl TeamIdField {
    /// Non-digit values other than the marker are treated as absent.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim().trim_start_matches('\'');
        if trimmed == NOT_FOUND_MARKER {
            return TeamIdField::NotFound;
        }
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<u32>() {
                return TeamIdField::Id(id);
            }
        }
        TeamIdField::Empty
    }

    pub fn to_cell(&self) -> String {
        match self {
            TeamIdField::Empty => String::new(),
            TeamIdField::NotFound => NOT_FOUND_MARKER.to_string(),
            TeamIdField::Id(id) => id.to_string(),
        }
    }

    pub fn id(&self) -> Option<u32> {
        match self {
            TeamIdField::Id(id) => Some(*id),
            _ => None,
        }
    }
}

// ============================================================================
// Fixtures (read-only provider data)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u32,
    pub name: String,
}

/// Team search hit from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: u32,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: u64,
    pub kickoff: Option<String>,
    /// Provider short status, e.g. `NS`, `1H`, `FT`.
    pub status_short: String,
    pub home: TeamRef,
    pub away: TeamRef,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

impl Fixture {
    pub fn is_finished(&self) -> bool {
        matches!(self.status_short.as_str(), "FT" | "AET" | "PEN")
    }

    pub fn final_score(&self) -> Option<(u32, u32)> {
        Some((self.home_goals?, self.away_goals?))
    }
}

// ============================================================================
// Bet records
// ============================================================================

/// One wagering tip as written to the live table.
#[derive(Debug, Clone, PartialEq)]
pub struct BetRecord {
    pub bet_id: String,
    pub tipster: String,
    pub house: String,
    pub bet_type: String,
    pub sport: String,
    pub match_description: String,
    pub bet_description: String,
    pub entry_description: String,
    pub odds: String,
    pub stake_unit: String,
    pub status: BetStatus,
    pub event_datetime: Option<NaiveDateTime>,
    /// Cell text used when the event time could not be parsed.
    pub event_text: String,
    pub source_link: String,
    pub home_team_id: TeamIdField,
    pub away_team_id: TeamIdField,
    pub day_of_month: u32,
}

impl BetRecord {
    /// Build a record from an enriched payload.
    ///
    /// `bet_id` is generated only when no existing identity is supplied.
    pub fn from_payload(
        payload: &BetPayload,
        source_link: &str,
        existing_bet_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Self {
        let event_datetime = payload.parsed_event_datetime(now);
        let event_text = match payload.event_datetime.as_deref() {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => crate::utils::dates::format_event_datetime(&now),
        };
        let day_of_month = event_datetime.map(|dt| dt.day()).unwrap_or_else(|| now.day());

        Self {
            bet_id: existing_bet_id
                .filter(|id| !id.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(generate_bet_id),
            tipster: payload.tipster.clone().unwrap_or_default(),
            house: payload.house.clone().unwrap_or_default(),
            bet_type: payload.bet_type.clone().unwrap_or_default(),
            sport: payload.sport.clone().unwrap_or_default(),
            match_description: payload.match_description.clone().unwrap_or_default(),
            bet_description: payload.bet_description.clone().unwrap_or_default(),
            entry_description: payload.entry_description.clone().unwrap_or_default(),
            odds: payload.odds.clone().unwrap_or_default(),
            stake_unit: payload.stake_unit.clone().unwrap_or_default(),
            status: BetStatus::Pending,
            event_datetime,
            event_text,
            source_link: source_link.to_string(),
            home_team_id: payload.home_team_id,
            away_team_id: payload.away_team_id,
            day_of_month,
        }
    }

    pub fn event_cell(&self) -> String {
        match &self.event_datetime {
            Some(dt) => crate::utils::dates::format_event_datetime(dt),
            None => self.event_text.clone(),
        }
    }
}

/// `bet_<timestamp>_<suffix>`; unique per call.
pub fn generate_bet_id() -> String {
    let ts = Local::now().format("%Y%m%d%H%M%S%6f");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("bet_{}_{}", ts, &suffix[..8])
}

// ============================================================================
// Dedup records
// ============================================================================

/// Marks one (channel, message) pair as already handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedMessageRecord {
    pub channel_id: i64,
    pub message_id: i64,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cells() {
        assert_eq!(BetStatus::from_cell("Pendente"), Some(BetStatus::Pending));
        assert_eq!(BetStatus::from_cell(" green "), Some(BetStatus::Win));
        assert_eq!(BetStatus::from_cell("RED"), Some(BetStatus::Loss));
        assert_eq!(
            BetStatus::from_cell("Revisão (MatchNotFound)"),
            Some(BetStatus::NeedsReview)
        );
        assert_eq!(BetStatus::from_cell("Anulada"), None);
        for status in [
            BetStatus::Pending,
            BetStatus::Win,
            BetStatus::Loss,
            BetStatus::NeedsReview,
            BetStatus::Error,
        ] {
            assert_eq!(BetStatus::from_cell(status.as_cell()), Some(status));
        }
        assert!(!BetStatus::Pending.is_terminal());
        assert!(BetStatus::Error.is_terminal());
    }

    #[test]
    fn test_team_id_cells() {
        assert_eq!(TeamIdField::from_cell("541"), TeamIdField::Id(541));
        assert_eq!(TeamIdField::from_cell(NOT_FOUND_MARKER), TeamIdField::NotFound);
        assert_eq!(TeamIdField::from_cell("541.0"), TeamIdField::Empty);
        assert_eq!(TeamIdField::from_cell("abc"), TeamIdField::Empty);
        assert_eq!(TeamIdField::from_cell(""), TeamIdField::Empty);
        assert_eq!(TeamIdField::NotFound.to_cell(), NOT_FOUND_MARKER);
        assert_eq!(TeamIdField::Empty.to_cell(), "");
        assert_eq!(TeamIdField::Id(7).id(), Some(7));
    }

    #[test]
    fn test_fixture_final_score() {
        let mut fixture = Fixture {
            fixture_id: 1,
            kickoff: None,
            status_short: "NS".to_string(),
            home: TeamRef { id: 1, name: "A".to_string() },
            away: TeamRef { id: 2, name: "B".to_string() },
            home_goals: None,
            away_goals: None,
        };
        assert!(!fixture.is_finished());
        assert_eq!(fixture.final_score(), None);

        fixture.status_short = "FT".to_string();
        fixture.home_goals = Some(2);
        fixture.away_goals = Some(0);
        assert!(fixture.is_finished());
        assert_eq!(fixture.final_score(), Some((2, 0)));
    }

    #[test]
    fn test_generated_bet_ids_are_unique() {
        let a = generate_bet_id();
        let b = generate_bet_id();
        assert!(a.starts_with("bet_"));
        assert_ne!(a, b);
    }
}
