//! Win/loss determination from free-text bet descriptions and final scores.
//!
//! Heuristic: first matching rule wins, anything unrecognized goes to
//! manual review rather than a guessed verdict.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{BetStatus, Fixture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    /// Fixture has no final score yet; status must not move.
    Pending,
    NeedsReview,
}

impl Outcome {
    fn from_bool(win: bool) -> Self {
        if win {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }

    /// Status to write, `None` when the row stays pending.
    pub fn status(&self) -> Option<BetStatus> {
        match self {
            Outcome::Win => Some(BetStatus::Win),
            Outcome::Loss => Some(BetStatus::Loss),
            Outcome::NeedsReview => Some(BetStatus::NeedsReview),
            Outcome::Pending => None,
        }
    }
}

// ============================================================================
// Patterns
// ============================================================================

const DRAW_TOKENS: [&str; 2] = ["empate", "draw"];
const BTTS_NO_TOKENS: [&str; 6] = [
    "ambas marcam não",
    "ambas marcam nao",
    "ambas não marcam",
    "btts não",
    "btts nao",
    "btts no",
];
const BTTS_TOKENS: [&str; 2] = ["ambas marcam", "btts"];

fn over_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:mais de|acima de|over|\+)\s*(\d+(?:[.,]\d+)?)").expect("static regex")
    })
}

fn under_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:menos de|abaixo de|under|(?:^|\s)-)\s*(\d+(?:[.,]\d+)?)").expect("static regex")
    })
}

/// Accepts both "2.5" and "2,5".
fn threshold(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    caps[1].replace(',', ".").parse().ok()
}

fn contains_any(text: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| text.contains(t))
}

// ============================================================================
// Engine
// ============================================================================

/// Verdict for `bet_text` against `fixture`.
pub fn determine_outcome(bet_text: &str, fixture: &Fixture) -> Outcome {
    let Some((home_goals, away_goals)) = fixture.final_score() else {
        return Outcome::Pending;
    };
    let text = bet_text.to_lowercase();
    let home_name = fixture.home.name.trim().to_lowercase();
    let away_name = fixture.away.name.trim().to_lowercase();

    if !home_name.is_empty() && text.contains(&home_name) {
        return Outcome::from_bool(home_goals > away_goals);
    }
    if !away_name.is_empty() && text.contains(&away_name) {
        return Outcome::from_bool(away_goals > home_goals);
    }
    if contains_any(&text, &DRAW_TOKENS) {
        return Outcome::from_bool(home_goals == away_goals);
    }
    if contains_any(&text, &BTTS_NO_TOKENS) {
        return Outcome::from_bool(home_goals == 0 || away_goals == 0);
    }
    if contains_any(&text, &BTTS_TOKENS) {
        return Outcome::from_bool(home_goals > 0 && away_goals > 0);
    }

    let total = f64::from(home_goals + away_goals);
    if let Some(line) = threshold(over_re(), &text) {
        return Outcome::from_bool(total > line);
    }
    if let Some(line) = threshold(under_re(), &text) {
        return Outcome::from_bool(total < line);
    }
    Outcome::NeedsReview
}
