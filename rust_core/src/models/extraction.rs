//! Typed AI responses.
//!
//! The AI collaborator only returns free text. These parsers pull a JSON
//! object out of it and map every unexpected shape to an error instead of
//! guessing at fields.

use crate::error::ExtractionError;
use crate::models::TeamIdField;
use crate::utils::dates::{parse_event_datetime, DEFAULT_KICKOFF};
use crate::utils::text::extract_json_object;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

/// Separator between legs of a multi-leg tip.
pub const LEG_SEPARATOR: &str = " & ";

/// Structured fields of a tip proposal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetPayload {
    pub tipster: Option<String>,
    pub house: Option<String>,
    pub bet_type: Option<String>,
    pub sport: Option<String>,
    pub match_description: Option<String>,
    pub bet_description: Option<String>,
    pub entry_description: Option<String>,
    pub odds: Option<String>,
    pub stake_unit: Option<String>,
    pub event_datetime: Option<String>,
    pub home_team_id: TeamIdField,
    pub away_team_id: TeamIdField,
}

impl BetPayload {
    /// First leg of the match description, used for fixture lookups.
    pub fn primary_match(&self) -> Option<&str> {
        let description = self.match_description.as_deref()?;
        let first = description.split(LEG_SEPARATOR).next()?.trim();
        if first.is_empty() {
            None
        } else {
            Some(first)
        }
    }

    pub fn parsed_event_datetime(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        parse_event_datetime(self.event_datetime.as_deref()?, now)
    }

    /// Football tips are the only ones the fixture provider can resolve.
    ///
    /// An unset sport is assumed to be football.
    pub fn is_football(&self) -> bool {
        match self.sport.as_deref().map(|s| s.trim().to_lowercase()) {
            None => true,
            Some(sport) if sport.is_empty() => true,
            Some(sport) => ["futebol", "soccer", "football", "fútbol"]
                .iter()
                .any(|name| sport.contains(name)),
        }
    }
}

/// Classification of an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    NewBet(BetPayload),
    Other { label: String },
    Error { reason: ExtractionError },
}

impl ExtractionResult {
    /// Parse a raw AI reply, failing closed.
    pub fn parse(reply: &str) -> Self {
        match parse_extraction(reply) {
            Ok(result) => result,
            Err(reason) => ExtractionResult::Error { reason },
        }
    }
}

fn parse_object(reply: &str) -> Result<Map<String, Value>, ExtractionError> {
    let json = extract_json_object(reply).ok_or(ExtractionError::NoJson)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ExtractionError::MalformedJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::UnexpectedShape(format!(
            "top level is {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_extraction(reply: &str) -> Result<ExtractionResult, ExtractionError> {
    let root = parse_object(reply)?;

    let label = match root.get("message_type") {
        Some(Value::String(label)) if !label.trim().is_empty() => label.trim().to_lowercase(),
        Some(other) => {
            return Err(ExtractionError::UnexpectedShape(format!(
                "message_type is {}",
                type_name(other)
            )))
        }
        None => {
            return Err(ExtractionError::UnexpectedShape(
                "missing message_type".to_string(),
            ))
        }
    };

    match label.as_str() {
        "new_bet" | "nova_aposta" => {}
        "erro_ia" | "error" => {
            return Err(ExtractionError::UnexpectedShape(format!(
                "model reported {}",
                label
            )))
        }
        _ => return Ok(ExtractionResult::Other { label }),
    }

    let data = match root.get("data") {
        Some(Value::Object(data)) => data,
        Some(other) => {
            return Err(ExtractionError::UnexpectedShape(format!(
                "data is {}",
                type_name(other)
            )))
        }
        None => return Err(ExtractionError::UnexpectedShape("missing data".to_string())),
    };

    Ok(ExtractionResult::NewBet(parse_payload(data)?))
}

/// String or number field under any of `keys`; other types are rejected.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, ExtractionError> {
    for key in keys {
        match obj.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Ok(Some(trimmed.to_string()));
                }
            }
            Some(Value::Number(n)) => return Ok(Some(n.to_string())),
            Some(other) => {
                return Err(ExtractionError::UnexpectedShape(format!(
                    "field {} is {}",
                    key,
                    type_name(other)
                )))
            }
        }
    }
    Ok(None)
}

fn join_legs(values: Vec<String>) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(LEG_SEPARATOR))
    }
}

fn parse_payload(data: &Map<String, Value>) -> Result<BetPayload, ExtractionError> {
    let mut payload = BetPayload {
        tipster: text_field(data, &["tipster"])?,
        house: text_field(data, &["house", "casa_de_aposta"])?,
        bet_type: text_field(data, &["bet_type", "tipo_aposta"])?,
        sport: text_field(data, &["sport", "esporte"])?,
        match_description: text_field(data, &["match", "jogos_concatenados", "jogos"])?,
        bet_description: text_field(data, &["description", "descricao_concatenada", "descricao_aposta"])?,
        entry_description: text_field(data, &["entry", "entrada_concatenada", "entrada"])?,
        odds: text_field(data, &["odds", "odd"])?,
        stake_unit: text_field(data, &["stake_unit", "unidade_percentual"])?,
        event_datetime: text_field(data, &["event_datetime", "data_evento_completa"])?,
        ..Default::default()
    };

    // Older prompt revisions nest per-leg fields under "entradas".
    let legs = match data.get("entradas").or_else(|| data.get("legs")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut legs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(leg) => legs.push(leg),
                    other => {
                        return Err(ExtractionError::UnexpectedShape(format!(
                            "leg is {}",
                            type_name(other)
                        )))
                    }
                }
            }
            legs
        }
        Some(other) => {
            return Err(ExtractionError::UnexpectedShape(format!(
                "entradas is {}",
                type_name(other)
            )))
        }
    };

    if let Some(first) = legs.first() {
        let concatenated = |keys: &[&str]| text_field(first, keys);
        if payload.match_description.is_none() {
            payload.match_description = match concatenated(&["jogos_concatenados", "match_concat"])? {
                Some(joined) => Some(joined),
                None => join_legs(collect_leg_values(&legs, &["jogos", "match"])?),
            };
        }
        if payload.bet_description.is_none() {
            payload.bet_description = match concatenated(&["descricao_concatenada"])? {
                Some(joined) => Some(joined),
                None => join_legs(collect_leg_values(&legs, &["descricao_aposta", "description"])?),
            };
        }
        if payload.entry_description.is_none() {
            payload.entry_description = match concatenated(&["entrada_concatenada"])? {
                Some(joined) => Some(joined),
                None => join_legs(collect_leg_values(&legs, &["entrada", "entry"])?),
            };
        }
        if payload.odds.is_none() {
            payload.odds = concatenated(&["odd", "odds"])?;
        }
        if payload.stake_unit.is_none() {
            payload.stake_unit = concatenated(&["unidade_percentual", "stake_unit"])?;
        }
    }

    Ok(payload)
}

fn collect_leg_values(
    legs: &[&Map<String, Value>],
    keys: &[&str],
) -> Result<Vec<String>, ExtractionError> {
    let mut values = Vec::new();
    for leg in legs {
        if let Some(value) = text_field(leg, keys)? {
            values.push(value);
        }
    }
    Ok(values)
}

/// Second-pass confirmation of team names and event time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub match_found: bool,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl ValidationResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Parse a validation reply. Anything unusable means "not found".
    pub fn parse(reply: &str) -> Result<Self, ExtractionError> {
        let root = parse_object(reply)?;
        let match_found = match root
            .get("match_found")
            .or_else(|| root.get("partida_encontrada"))
        {
            Some(Value::Bool(found)) => *found,
            Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "sim" | "yes"),
            None | Some(Value::Null) => false,
            Some(other) => {
                return Err(ExtractionError::UnexpectedShape(format!(
                    "match_found is {}",
                    type_name(other)
                )))
            }
        };

        let result = Self {
            match_found,
            home_team: text_field(&root, &["home_team", "time_casa_oficial"])?,
            away_team: text_field(&root, &["away_team", "time_visitante_oficial"])?,
            date: text_field(&root, &["date", "data_oficial"])?,
            time: text_field(&root, &["time", "hora_oficial"])?,
        };

        // A confirmation without the corrected fields cannot be merged.
        if result.match_found && result.canonical_description().is_none() {
            return Ok(Self::not_found());
        }
        Ok(result)
    }

    pub fn canonical_description(&self) -> Option<String> {
        if !self.match_found {
            return None;
        }
        Some(format!(
            "{} vs {}",
            self.home_team.as_deref()?,
            self.away_team.as_deref()?
        ))
    }

    pub fn canonical_datetime(&self) -> Option<String> {
        if !self.match_found {
            return None;
        }
        let date = self.date.as_deref()?;
        let time = self
            .time
            .clone()
            .unwrap_or_else(|| format!("{:02}:{:02}", DEFAULT_KICKOFF.0, DEFAULT_KICKOFF.1));
        Some(format!("{} {}", date, time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_new_bet() {
        let reply = r#"```json
        {"message_type": "new_bet", "data": {
            "tipster": "Canal X", "house": "Bet365", "sport": "Futebol",
            "match": "Flamengo x Palmeiras", "entry": "Flamengo vence",
            "odds": 1.85, "stake_unit": "1u", "event_datetime": "19/10/2026 16:00"
        }}
        ```"#;
        let ExtractionResult::NewBet(payload) = ExtractionResult::parse(reply) else {
            panic!("expected new bet");
        };
        assert_eq!(payload.match_description.as_deref(), Some("Flamengo x Palmeiras"));
        assert_eq!(payload.odds.as_deref(), Some("1.85"));
        assert_eq!(payload.home_team_id, TeamIdField::Empty);
        assert!(payload.is_football());
    }

    #[test]
    fn test_parse_nested_legs() {
        let reply = r#"{"message_type": "nova_aposta", "data": {
            "casa_de_aposta": "Betano", "esporte": "Futebol",
            "entradas": [
                {"jogos": "Santos x Sport", "entrada": "Santos", "odd": "1.50"},
                {"jogos": "Bahia x Ceará", "entrada": "Over 2.5"}
            ]
        }}"#;
        let ExtractionResult::NewBet(payload) = ExtractionResult::parse(reply) else {
            panic!("expected new bet");
        };
        assert_eq!(payload.house.as_deref(), Some("Betano"));
        assert_eq!(
            payload.match_description.as_deref(),
            Some("Santos x Sport & Bahia x Ceará")
        );
        assert_eq!(payload.primary_match(), Some("Santos x Sport"));
        assert_eq!(payload.entry_description.as_deref(), Some("Santos & Over 2.5"));
        assert_eq!(payload.odds.as_deref(), Some("1.50"));
    }

    #[test]
    fn test_parse_other_and_errors() {
        assert_eq!(
            ExtractionResult::parse(r#"{"message_type": "resultado", "data": {}}"#),
            ExtractionResult::Other { label: "resultado".to_string() }
        );
        assert!(matches!(
            ExtractionResult::parse("desculpe, não entendi"),
            ExtractionResult::Error { reason: ExtractionError::NoJson }
        ));
        assert!(matches!(
            ExtractionResult::parse(r#"{"message_type": "new_bet", "data": {"match": "#),
            ExtractionResult::Error { .. }
        ));
        assert!(matches!(
            ExtractionResult::parse(r#"{"message_type": "new_bet", "data": ["x"]}"#),
            ExtractionResult::Error { reason: ExtractionError::UnexpectedShape(_) }
        ));
        assert!(matches!(
            ExtractionResult::parse(r#"{"message_type": 3}"#),
            ExtractionResult::Error { .. }
        ));
        assert!(matches!(
            ExtractionResult::parse(r#"{"message_type": "new_bet", "data": {"match": {"a": 1}}}"#),
            ExtractionResult::Error { .. }
        ));
    }

    #[test]
    fn test_football_gate() {
        let mut payload = BetPayload::default();
        assert!(payload.is_football());
        payload.sport = Some("Basquete".to_string());
        assert!(!payload.is_football());
        payload.sport = Some("Futebol Feminino".to_string());
        assert!(payload.is_football());
    }

    #[test]
    fn test_parse_validation() {
        let reply = r#"{"partida_encontrada": true, "time_casa_oficial": "Real Madrid",
            "time_visitante_oficial": "Barcelona", "data_oficial": "26/10/2026"}"#;
        let result = ValidationResult::parse(reply).unwrap();
        assert!(result.match_found);
        assert_eq!(result.canonical_description().as_deref(), Some("Real Madrid vs Barcelona"));
        assert_eq!(result.canonical_datetime().as_deref(), Some("26/10/2026 12:00"));

        let incomplete = ValidationResult::parse(r#"{"match_found": true, "home_team": "A"}"#).unwrap();
        assert!(!incomplete.match_found);

        let missing = ValidationResult::parse(r#"{"match_found": false}"#).unwrap();
        assert_eq!(missing.canonical_description(), None);
        assert!(ValidationResult::parse("nada").is_err());
    }
}
