//! Editor configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! no file at all) is valid.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClipdeckError, Result};

/// Default delay between the last edit and the remote write.
pub const DEFAULT_DEBOUNCE_MS: u64 = 5_000;

/// Default upper bound for a single remote write.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 30_000;

/// Default candidate count for the unordered startup query.
pub const DEFAULT_FALLBACK_QUERY_LIMIT: usize = 20;

/// Default key of the local project snapshot.
pub const DEFAULT_LOCAL_KEY: &str = "clipdeck.project";

/// Default remote collection holding projects.
pub const DEFAULT_COLLECTION: &str = "projects";

/// Default number of history entries kept before folding into the baseline.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub persistence: PersistenceConfig,
    pub history: HistoryConfig,
}

/// Settings for the local and remote persistence tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Trailing debounce window for remote writes, in milliseconds.
    pub debounce_ms: u64,

    /// Timeout for one remote write, in milliseconds. `None` waits forever.
    pub write_timeout_ms: Option<u64>,

    /// Limit for the unordered owner query used when the ordered one fails.
    pub fallback_query_limit: usize,

    /// Key of the project snapshot in the local store.
    pub local_key: String,

    /// Remote collection name.
    pub collection: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            write_timeout_ms: Some(DEFAULT_WRITE_TIMEOUT_MS),
            fallback_query_limit: DEFAULT_FALLBACK_QUERY_LIMIT,
            local_key: DEFAULT_LOCAL_KEY.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl PersistenceConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for the undo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of entries kept in the log.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EditorConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ClipdeckError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: EditorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values that would make the editor misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.history.max_entries == 0 {
            return Err(ClipdeckError::InvalidConfig {
                reason: "history.maxEntries must be at least 1".to_string(),
            });
        }
        if self.persistence.local_key.is_empty() {
            return Err(ClipdeckError::InvalidConfig {
                reason: "persistence.localKey must not be empty".to_string(),
            });
        }
        if self.persistence.collection.is_empty() {
            return Err(ClipdeckError::InvalidConfig {
                reason: "persistence.collection must not be empty".to_string(),
            });
        }
        if self.persistence.fallback_query_limit == 0 {
            return Err(ClipdeckError::InvalidConfig {
                reason: "persistence.fallbackQueryLimit must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
