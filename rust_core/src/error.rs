//! Reason codes shared across the pipeline.
//!
//! Per-item failures are returned as values so orchestrators can branch on
//! the cause; only start-up problems are fatal.

use thiserror::Error;

/// Why a fixture lookup did not produce a fixture.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("event description is empty")]
    InvalidDescription,

    #[error("could not split '{0}' into two team names")]
    ParseError(String),

    #[error("team not found: {0}")]
    TeamNotFound(String),

    #[error("unparseable event date: '{0}'")]
    InvalidDate(String),

    #[error("no fixture for home {home_id} vs away {away_id} on {date}")]
    MatchNotFound {
        home_id: u32,
        away_id: u32,
        date: String,
    },

    #[error("provider error: {0}")]
    ApiError(String),
}

impl ResolveError {
    /// Short code written to logs and review cells.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::InvalidDescription => "InvalidDescription",
            ResolveError::ParseError(_) => "ParseError",
            ResolveError::TeamNotFound(_) => "TeamNotFound",
            ResolveError::InvalidDate(_) => "InvalidDate",
            ResolveError::MatchNotFound { .. } => "MatchNotFound",
            ResolveError::ApiError(_) => "ApiError",
        }
    }

    /// Transient failures leave rows untouched instead of flagging them.
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolveError::ApiError(_))
    }
}

/// AI output that could not be turned into a typed result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no JSON object in AI response")]
    NoJson,

    #[error("malformed JSON in AI response: {0}")]
    MalformedJson(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("AI service failure: {0}")]
    Service(String),
}

/// Fatal start-up configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("prompt template not found at {path}: {source}")]
    MissingPrompt {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
