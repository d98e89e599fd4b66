//! Search history with pluggable blob storage.
//!
//! The pipeline core only depends on [`HistoryStore`], a one-blob
//! key-value interface; the file-backed implementation lives alongside it.
//! Entries are most-recent-first, deduplicated by URL, and capped.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};

/// Maximum number of entries retained, most-recent-first.
pub const HISTORY_CAP: usize = 10;

/// One successfully analyzed URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SearchHistoryEntry {
    pub url: String,
    pub title: String,
    pub artist: String,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: i64,
}

/// One-blob storage interface so the pipeline has no dependency on a
/// specific persistence mechanism.
pub trait HistoryStore: Send {
    /// Loads the stored blob; `Ok(None)` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, String>;
    /// Replaces the stored blob.
    fn save(&self, blob: &str) -> Result<(), String>;
}

/// File-backed store keeping the history as one JSON document.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default on-disk location of the history blob.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|root| root.join("tunescout").join("history.json"))
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Result<Option<String>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|error| format!("Failed to read {}: {}", self.path.display(), error))
    }

    fn save(&self, blob: &str) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| format!("Failed to create {}: {}", parent.display(), error))?;
        }
        std::fs::write(&self.path, blob)
            .map_err(|error| format!("Failed to write {}: {}", self.path.display(), error))
    }
}

/// Recency-ordered search history persisted through a [`HistoryStore`].
pub struct SearchHistory {
    store: Box<dyn HistoryStore>,
    entries: Vec<SearchHistoryEntry>,
}

impl SearchHistory {
    /// Loads saved entries from the store. A missing or corrupt blob
    /// starts an empty history instead of failing.
    pub fn load(store: Box<dyn HistoryStore>) -> Self {
        let entries = match store.load() {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<SearchHistoryEntry>>(&blob) {
                Ok(mut entries) => {
                    entries.truncate(HISTORY_CAP);
                    entries
                }
                Err(error) => {
                    warn!("History blob is corrupt, starting empty: {}", error);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!("Failed to load history, starting empty: {}", error);
                Vec::new()
            }
        };
        Self { store, entries }
    }

    /// Current entries, most-recent-first.
    pub fn entries(&self) -> &[SearchHistoryEntry] {
        &self.entries
    }

    /// Appends or promotes an entry for a successfully analyzed URL.
    pub fn record(&mut self, url: &str, title: &str, artist: &str) {
        self.record_at(url, title, artist, now_unix_ms());
    }

    fn record_at(&mut self, url: &str, title: &str, artist: &str, timestamp_ms: i64) {
        self.entries.retain(|entry| entry.url != url);
        self.entries.insert(
            0,
            SearchHistoryEntry {
                url: url.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                timestamp_ms,
            },
        );
        self.entries.truncate(HISTORY_CAP);
        self.persist();
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    fn persist(&self) {
        match serde_json::to_string(&self.entries) {
            Ok(blob) => {
                if let Err(error) = self.store.save(&blob) {
                    warn!("Failed to persist history: {}", error);
                } else {
                    debug!("History persisted, {} entries", self.entries.len());
                }
            }
            Err(error) => warn!("Failed to serialize history: {}", error),
        }
    }
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
