//! Team-name normalization and fixture resolution.

pub mod normalizer;
pub mod resolver;

pub use normalizer::{clean_name, NameNormalizer, NormalizedName};
pub use resolver::{split_teams, MatchResolver, IGNORED_TEAM_NAMES, TEAM_SEPARATORS};
