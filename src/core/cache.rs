use crate::domain::model::SubjectId;
use crate::utils::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const CACHE_VERSION: u32 = 1;

/// One cached payload, stamped with the instant of the successful fetch.
/// Overwritten wholesale on refresh, never merged field-by-field. The
/// timestamp stays a string on disk; an unparseable one just means stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "fetchedAt")]
    pub fetched_at: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// On-disk JSON store mapping subject id to a timestamped payload:
/// `{"version": 1, "entries": {"<id>": {"fetchedAt": "...", ...}}}`.
/// Entry keys serialize as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessCache {
    pub version: u32,
    pub entries: HashMap<SubjectId, CacheEntry>,
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }
}

impl FreshnessCache {
    /// Loads a cache file, failing soft: any read or parse error, or a
    /// version mismatch, yields an empty cache. Corruption is logged so
    /// surrounding tooling can report it, then the file is simply rebuilt
    /// on the next save.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cache file at {}, starting empty", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read cache {}: {}. Starting empty", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<FreshnessCache>(&content) {
            Ok(cache) if cache.version == CACHE_VERSION => cache,
            Ok(cache) => {
                tracing::warn!(
                    "Cache {} has version {} (expected {}). Starting empty",
                    path.display(),
                    cache.version,
                    CACHE_VERSION
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Cache {} is corrupt: {}. Starting empty",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Writes the whole cache, creating parent directories as needed.
    /// Best-effort persistence; a crash mid-write may lose the file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Fresh value for `id`, or `None` when the entry is missing or stale.
    /// A stale entry is treated as unknown until refreshed, never used as-is.
    pub fn get(
        &self,
        id: SubjectId,
        max_age_days: i64,
    ) -> Option<&serde_json::Map<String, serde_json::Value>> {
        let entry = self.entries.get(&id)?;
        is_fresh(Some(entry), max_age_days).then_some(&entry.payload)
    }

    /// Inserts or replaces the entry for `id`, stamped now.
    pub fn set(&mut self, id: SubjectId, payload: serde_json::Map<String, serde_json::Value>) {
        self.entries.insert(
            id,
            CacheEntry {
                fetched_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                payload,
            },
        );
    }

    /// Subjects whose entry is missing or stale, deduplicated, preserving
    /// input order.
    pub fn split_by_freshness(&self, ids: &[SubjectId], max_age_days: i64) -> Vec<SubjectId> {
        let mut seen = HashSet::new();
        ids.iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .filter(|id| !is_fresh(self.entries.get(id), max_age_days))
            .collect()
    }
}

/// False for a missing entry, an unparseable timestamp, negative age
/// (clock skew), or age beyond the window.
pub fn is_fresh(entry: Option<&CacheEntry>, max_age_days: i64) -> bool {
    let Some(entry) = entry else {
        return false;
    };
    let Ok(fetched_at) = DateTime::parse_from_rfc3339(&entry.fetched_at) else {
        return false;
    };
    let age = Utc::now().signed_duration_since(fetched_at.with_timezone(&Utc));
    age >= chrono::Duration::zero() && age <= chrono::Duration::days(max_age_days)
}
