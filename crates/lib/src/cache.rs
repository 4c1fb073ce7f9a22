//! # Query Cache
//!
//! Maps normalized questions to accepted SQL. The whole map is rewritten to
//! `<cache_dir>/query_cache.json` on every change, through a temp file that is
//! renamed over the target so a crash never leaves a half-written cache.

use crate::{constants::CACHE_FILE_NAME, errors::EngineError, question::normalize};
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{Arc, Mutex as StdMutex},
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, String>>,
    /// `None` keeps the cache in memory only.
    path: Option<PathBuf>,
    /// Serializes "mutate then persist" so files are written in order.
    writer: Mutex<()>,
    in_flight: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QueryCache {
    /// A cache that is never persisted.
    pub fn in_memory() -> Self {
        Self::with_entries(HashMap::new(), None)
    }

    /// Loads the cache persisted under `dir`.
    ///
    /// A missing file starts an empty cache. An unreadable or corrupt file is
    /// logged and also starts empty; the next write replaces it.
    pub async fn load(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(CACHE_FILE_NAME);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(entries) => {
                    info!(path = %path.display(), count = entries.len(), "Loaded query cache");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), "Query cache is corrupt, starting empty: {e}");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No query cache on disk yet");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), "Could not read query cache, starting empty: {e}");
                HashMap::new()
            }
        };
        Self::with_entries(entries, Some(path))
    }

    fn with_entries(entries: HashMap<String, String>, path: Option<PathBuf>) -> Self {
        Self {
            entries: RwLock::new(entries),
            path,
            writer: Mutex::new(()),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    /// The persisted file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get(&self, question: &str) -> Option<String> {
        self.entries.read().await.get(&normalize(question)).cloned()
    }

    /// Stores `sql` for `question` and persists the whole map.
    ///
    /// The in-memory entry is kept even when persisting fails.
    pub async fn set(&self, question: &str, sql: &str) -> Result<(), EngineError> {
        let _writer = self.writer.lock().await;
        let mut entries = self.entries.write().await;
        entries.insert(normalize(question), sql.to_string());
        self.persist(&sorted(&entries)).await
    }

    /// Drops every entry and persists the empty map.
    pub async fn clear(&self) -> Result<(), EngineError> {
        let _writer = self.writer.lock().await;
        self.entries.write().await.clear();
        info!("Query cache cleared");
        self.persist(&BTreeMap::new()).await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Holds the per-question guard. While it is held, other callers asking
    /// the same normalized question wait instead of generating in parallel.
    pub async fn lock_key(&self, question: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Slots nobody else holds a handle to are finished; drop them.
            in_flight.retain(|_, slot| Arc::strong_count(slot) > 1);
            in_flight.entry(normalize(question)).or_default().clone()
        };
        slot.lock_owned().await
    }

    async fn persist(&self, entries: &BTreeMap<&str, &str>) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let to_err =
            |e: std::io::Error| EngineError::CachePersistence(format!("{}: {e}", path.display()));

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(to_err)?;
        }
        let body = serde_json::to_string_pretty(entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(to_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(to_err)?;
        debug!(path = %path.display(), count = entries.len(), "Persisted query cache");
        Ok(())
    }
}

fn sorted(entries: &HashMap<String, String>) -> BTreeMap<&str, &str> {
    entries
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}
