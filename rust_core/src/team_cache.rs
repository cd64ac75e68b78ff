//! Team alias cache: cleaned team name -> provider team ID.
//!
//! This module provides:
//! - The `AliasStore` seam used by the resolver
//! - A not-found sentinel so failed names are not searched again
//! - JSON persistence, written through on every insert

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Cached outcome of a team search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasEntry {
    Id(u32),
    NotFound,
}

#[async_trait]
pub trait AliasStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<AliasEntry>;

    /// Insert or overwrite one alias. Persistence failures are logged, not returned.
    async fn put(&self, key: &str, entry: AliasEntry);
}

/// Alias map held in memory and mirrored to a JSON file.
///
/// File format: `{"flamengo": 127, "time fantasma": null}`.
#[derive(Debug, Default)]
pub struct TeamAliasCache {
    entries: RwLock<HashMap<String, AliasEntry>>,
    path: Option<PathBuf>,
}

impl TeamAliasCache {
    /// Memory-only cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON file. A missing or unreadable file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, Option<u32>>>(&content) {
                Ok(raw) => {
                    info!("Loaded {} team aliases from {}", raw.len(), path.display());
                    raw.into_iter()
                        .map(|(k, v)| {
                            let entry = v.map(AliasEntry::Id).unwrap_or(AliasEntry::NotFound);
                            (k.to_lowercase(), entry)
                        })
                        .collect()
                }
                Err(e) => {
                    warn!("Ignoring malformed alias file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            entries: RwLock::new(entries),
            path: Some(path),
        }
    }

    fn save(path: &Path, entries: &HashMap<String, AliasEntry>) -> Result<()> {
        let raw: std::collections::BTreeMap<&str, Option<u32>> = entries
            .iter()
            .map(|(k, v)| {
                let id = match v {
                    AliasEntry::Id(id) => Some(*id),
                    AliasEntry::NotFound => None,
                };
                (k.as_str(), id)
            })
            .collect();
        let content = serde_json::to_string_pretty(&raw)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write alias file {}", path.display()))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AliasStore for TeamAliasCache {
    async fn get(&self, key: &str) -> Option<AliasEntry> {
        self.entries.read().await.get(&key.to_lowercase()).copied()
    }

    async fn put(&self, key: &str, entry: AliasEntry) {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
        if let Some(path) = &self.path {
            if let Err(e) = Self::save(path, &entries) {
                warn!("Alias cache write-through failed: {:#}", e);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}_{}.json", name, uuid::Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let cache = TeamAliasCache::new();
        cache.put("Flamengo", AliasEntry::Id(127)).await;
        cache.put("time fantasma", AliasEntry::NotFound).await;

        assert_eq!(cache.get("flamengo").await, Some(AliasEntry::Id(127)));
        assert_eq!(cache.get("FLAMENGO").await, Some(AliasEntry::Id(127)));
        assert_eq!(cache.get("time fantasma").await, Some(AliasEntry::NotFound));
        assert_eq!(cache.get("vasco").await, None);
    }

    #[tokio::test]
    async fn test_empty_key_is_ignored() {
        let cache = TeamAliasCache::new();
        cache.put("  ", AliasEntry::Id(1)).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_through_and_reload() {
        let path = temp_path("aliases");
        {
            let cache = TeamAliasCache::load(&path);
            assert!(cache.is_empty().await);
            cache.put("palmeiras", AliasEntry::Id(121)).await;
            cache.put("xyz fc", AliasEntry::NotFound).await;
        }

        let content = fs::read_to_string(&path).unwrap();
        let raw: HashMap<String, Option<u32>> = serde_json::from_str(&content).unwrap();
        assert_eq!(raw.get("palmeiras"), Some(&Some(121)));
        assert_eq!(raw.get("xyz fc"), Some(&None));

        let reloaded = TeamAliasCache::load(&path);
        assert_eq!(reloaded.len().await, 2);
        assert_eq!(reloaded.get("xyz fc").await, Some(AliasEntry::NotFound));
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_malformed_file_yields_empty_cache() {
        let path = temp_path("broken_aliases");
        fs::write(&path, "{not json").unwrap();
        let cache = TeamAliasCache::load(&path);
        assert!(cache.is_empty().await);
        let _ = fs::remove_file(&path);
    }
}
