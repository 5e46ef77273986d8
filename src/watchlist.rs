use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::catalog::{ItemKey, MediaItem, MediaKind};
use crate::storage::KeyValueStore;

pub const WATCHLIST_KEY: &str = "cinestream-watchlist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub item: MediaItem,
    pub kind: MediaKind,
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.kind, self.item.id)
    }
}

/// Saved titles, newest first, unique per (id, kind). Every operation reads and
/// rewrites the whole persisted collection.
pub struct WatchlistStore {
    store: Arc<dyn KeyValueStore>,
    // Serialises read-modify-write cycles.
    lock: Mutex<()>,
}

impl WatchlistStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Returns false without touching the collection when the key is already saved.
    pub fn add(&self, item: &MediaItem) -> Result<bool> {
        let _guard = self.guard();
        let mut entries = self.read();
        let key = ItemKey::new(item.kind(), item.id);
        if entries.iter().any(|e| e.key() == key) {
            debug!(id = item.id, kind = %key.kind, "Already in watchlist");
            return Ok(false);
        }
        entries.insert(
            0,
            WatchlistEntry {
                item: item.clone(),
                kind: key.kind,
                added_at: Utc::now(),
            },
        );
        self.write(&entries)?;
        Ok(true)
    }

    pub fn remove(&self, id: u64, kind: MediaKind) -> Result<bool> {
        let _guard = self.guard();
        let mut entries = self.read();
        let before = entries.len();
        entries.retain(|e| e.key() != ItemKey::new(kind, id));
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.guard();
        self.store
            .remove(WATCHLIST_KEY)
            .context("Failed to clear watchlist")
    }

    pub fn contains(&self, id: u64, kind: MediaKind) -> bool {
        let _guard = self.guard();
        self.read().iter().any(|e| e.key() == ItemKey::new(kind, id))
    }

    pub fn list(&self) -> Vec<WatchlistEntry> {
        let _guard = self.guard();
        self.read()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> Vec<WatchlistEntry> {
        let raw = match self.store.load(WATCHLIST_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to load watchlist, treating as empty: {:#}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Watchlist payload is corrupt, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write(&self, entries: &[WatchlistEntry]) -> Result<()> {
        let payload = serde_json::to_string(entries).context("Failed to serialize watchlist")?;
        self.store
            .save(WATCHLIST_KEY, &payload)
            .context("Failed to persist watchlist")
    }
}
