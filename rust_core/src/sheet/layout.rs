//! Fixed column layout of every bet table.

use crate::models::{BetRecord, BetStatus, TeamIdField};
use crate::utils::dates::parse_cell_datetime;
use crate::utils::text::escape_cell;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    DayOfMonth,
    Tipster,
    House,
    BetType,
    Match,
    Description,
    Entry,
    Sport,
    Odds,
    StakeUnit,
    Status,
    BetId,
    SourceLink,
    EventDateTime,
    HomeTeamId,
    AwayTeamId,
}

pub const COLUMNS: [Column; 16] = [
    Column::DayOfMonth,
    Column::Tipster,
    Column::House,
    Column::BetType,
    Column::Match,
    Column::Description,
    Column::Entry,
    Column::Sport,
    Column::Odds,
    Column::StakeUnit,
    Column::Status,
    Column::BetId,
    Column::SourceLink,
    Column::EventDateTime,
    Column::HomeTeamId,
    Column::AwayTeamId,
];

impl Column {
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Header text as it appears on row 1.
    pub fn header(&self) -> &'static str {
        match self {
            Column::DayOfMonth => "Dia do Mês",
            Column::Tipster => "Tipster",
            Column::House => "Casa de Apostas",
            Column::BetType => "Tipo de Aposta",
            Column::Match => "Jogos",
            Column::Description => "Descrição da Aposta",
            Column::Entry => "Entrada",
            Column::Sport => "ESPORTE",
            Column::Odds => "ODD",
            Column::StakeUnit => "Unidade/%",
            Column::Status => "Situação",
            Column::BetId => "Bet ID",
            Column::SourceLink => "Message Link",
            Column::EventDateTime => "Data Completa",
            Column::HomeTeamId => "Home Team ID",
            Column::AwayTeamId => "Away Team ID",
        }
    }
}

pub fn header_row() -> Vec<String> {
    COLUMNS.iter().map(|c| c.header().to_string()).collect()
}

impl BetRecord {
    /// Cells in column order, formula-escaped.
    pub fn to_row(&self) -> Vec<String> {
        COLUMNS
            .iter()
            .map(|column| {
                let value = match column {
                    Column::DayOfMonth => self.day_of_month.to_string(),
                    Column::Tipster => self.tipster.clone(),
                    Column::House => self.house.clone(),
                    Column::BetType => self.bet_type.clone(),
                    Column::Match => self.match_description.clone(),
                    Column::Description => self.bet_description.clone(),
                    Column::Entry => self.entry_description.clone(),
                    Column::Sport => self.sport.clone(),
                    Column::Odds => self.odds.clone(),
                    Column::StakeUnit => self.stake_unit.clone(),
                    Column::Status => self.status.as_cell().to_string(),
                    Column::BetId => self.bet_id.clone(),
                    Column::SourceLink => self.source_link.clone(),
                    Column::EventDateTime => self.event_cell(),
                    Column::HomeTeamId => self.home_team_id.to_cell(),
                    Column::AwayTeamId => self.away_team_id.to_cell(),
                };
                escape_cell(&value)
            })
            .collect()
    }
}

/// One data row read back from a table, addressed by its 1-based row number.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub row_number: usize,
    pub cells: Vec<String>,
}

impl StoredRow {
    /// Rows are padded so every column is addressable.
    pub fn new(row_number: usize, mut cells: Vec<String>) -> Self {
        if cells.len() < COLUMNS.len() {
            cells.resize(COLUMNS.len(), String::new());
        }
        Self { row_number, cells }
    }

    pub fn get(&self, column: Column) -> &str {
        self.cells
            .get(column.index())
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn set(&mut self, column: Column, value: &str) {
        self.cells[column.index()] = escape_cell(value);
    }

    pub fn bet_id(&self) -> &str {
        self.get(Column::BetId).trim()
    }

    pub fn status(&self) -> Option<BetStatus> {
        BetStatus::from_cell(self.get(Column::Status))
    }

    pub fn event_datetime(&self) -> Option<NaiveDateTime> {
        parse_cell_datetime(self.get(Column::EventDateTime))
    }

    pub fn home_team_id(&self) -> TeamIdField {
        TeamIdField::from_cell(self.get(Column::HomeTeamId))
    }

    pub fn away_team_id(&self) -> TeamIdField {
        TeamIdField::from_cell(self.get(Column::AwayTeamId))
    }

    /// Entry and description text, the input of outcome determination.
    pub fn bet_text(&self) -> String {
        format!("{} {}", self.get(Column::Entry), self.get(Column::Description))
    }

    /// Cells truncated to the fixed layout width.
    pub fn layout_cells(&self) -> Vec<String> {
        self.cells.iter().take(COLUMNS.len()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BetPayload;
    use chrono::NaiveDate;

    #[test]
    fn test_header_order() {
        let header = header_row();
        assert_eq!(header.len(), 16);
        assert_eq!(header[0], "Dia do Mês");
        assert_eq!(header[Column::Status.index()], "Situação");
        assert_eq!(header[Column::AwayTeamId.index()], "Away Team ID");
    }

    #[test]
    fn test_record_to_row_escapes_formulas() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let payload = BetPayload {
            tipster: Some("Canal".to_string()),
            entry_description: Some("=HYPERLINK(\"x\")".to_string()),
            match_description: Some("A x B".to_string()),
            event_datetime: Some("21/10/2026 19:30".to_string()),
            home_team_id: TeamIdField::Id(10),
            away_team_id: TeamIdField::NotFound,
            ..Default::default()
        };
        let record = BetRecord::from_payload(&payload, "https://t.me/c/1/2", Some("bet_1"), now);
        let row = record.to_row();
        assert_eq!(row[Column::Entry.index()], "'=HYPERLINK(\"x\")");
        assert_eq!(row[Column::DayOfMonth.index()], "21");
        assert_eq!(row[Column::Status.index()], "Pendente");
        assert_eq!(row[Column::BetId.index()], "bet_1");
        assert_eq!(row[Column::EventDateTime.index()], "21/10/2026 19:30");
        assert_eq!(row[Column::HomeTeamId.index()], "10");
        assert_eq!(row[Column::AwayTeamId.index()], "NAO_ENCONTRADO_API");
    }

    #[test]
    fn test_stored_row_accessors() {
        let mut row = StoredRow::new(5, vec!["1".to_string(), "T".to_string()]);
        assert_eq!(row.cells.len(), 16);
        assert_eq!(row.status(), None);
        row.set(Column::Status, "Pendente");
        row.set(Column::EventDateTime, "19/10/2026 16:00");
        row.set(Column::HomeTeamId, "33");
        assert_eq!(row.status(), Some(BetStatus::Pending));
        assert!(row.event_datetime().is_some());
        assert_eq!(row.home_team_id(), TeamIdField::Id(33));
        assert_eq!(row.away_team_id(), TeamIdField::Empty);
    }
}
