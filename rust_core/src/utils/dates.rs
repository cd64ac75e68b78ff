//! Day-first date handling for event times and sheet names.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

/// Cell format for `EventDateTime`.
pub const EVENT_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Kickoff assumed when a date carries no time token.
pub const DEFAULT_KICKOFF: (u32, u32) = (12, 0);

const MONTHS_PT: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("static regex"))
}

fn day_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4}|\d{2})\b").expect("static regex")
    })
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[:h](\d{2})\b").expect("static regex"))
}

fn default_kickoff() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_KICKOFF.0, DEFAULT_KICKOFF.1, 0).unwrap_or(NaiveTime::MIN)
}

fn extract_time(text: &str) -> Option<NaiveTime> {
    let caps = time_re().captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn extract_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = iso_date_re().captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let caps = day_first_re().captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if caps[3].len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn relative_offset(lower: &str) -> Option<i64> {
    if lower.contains("amanhã") || lower.contains("amanha") || lower.contains("tomorrow") {
        Some(1)
    } else if lower.contains("hoje") || lower.contains("today") {
        Some(0)
    } else {
        None
    }
}

/// Parse a free-text event date, day-first.
///
/// "hoje"/"amanhã" (and the English equivalents) resolve against `now`; a
/// missing time token means 12:00.
pub fn parse_event_datetime(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let time = extract_time(&lower).unwrap_or_else(default_kickoff);

    if let Some(days) = relative_offset(&lower) {
        let date = now.date() + Duration::days(days);
        return Some(date.and_time(time));
    }

    extract_date(&lower).map(|date| date.and_time(time))
}

/// Parse only a strict `DD/MM/YYYY HH:MM` cell value.
pub fn parse_cell_datetime(cell: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(cell.trim(), EVENT_DATETIME_FORMAT).ok()
}

pub fn format_event_datetime(dt: &NaiveDateTime) -> String {
    dt.format(EVENT_DATETIME_FORMAT).to_string()
}

/// Cold-storage sheet for a month, e.g. `Outubro-2026`.
pub fn month_sheet_name(date: NaiveDate) -> String {
    format!("{}-{}", MONTHS_PT[date.month0() as usize], date.year())
}
