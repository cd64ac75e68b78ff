//! Tipsheet Core - bet tip enrichment and result reconciliation.
//!
//! This crate provides:
//! - AI-assisted extraction and validation of tips posted in channels
//! - Team-name normalization and fixture resolution against API-Football
//! - Outcome determination from free-text bet descriptions and final scores
//! - The ingest handler, the auditor and the periodic results loop
//! - Adapters for Gemini, Google Sheets, Redis, SQLite, Tavily and Sofascore

pub mod audit;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod outcome;
pub mod redis;
pub mod results;
pub mod sheet;
pub mod team_cache;
pub mod transport;
pub mod utils;

pub use config::Config;
pub use error::{ConfigError, ExtractionError, ResolveError};
