//! Best-distance leaderboard
//!
//! Persisted as a bare JSON array of numbers, tracks the top 5 distances.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_RANKING_ITEMS, RANKING_KEY};
use crate::error::StorageError;
use crate::persistence::KeyValueStore;

/// Best distances, sorted descending, at most [`MAX_RANKING_ITEMS`] long
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking {
    entries: Vec<f32>,
}

impl Ranking {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from arbitrary values (sorted and truncated)
    pub fn from_values(values: impl IntoIterator<Item = f32>) -> Self {
        let mut entries: Vec<f32> = values.into_iter().filter(|v| v.is_finite()).collect();
        entries.sort_by(|a, b| b.total_cmp(a));
        entries.truncate(MAX_RANKING_ITEMS);
        Self { entries }
    }

    pub fn entries(&self) -> &[f32] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the best distance (if any)
    pub fn best(&self) -> Option<f32> {
        self.entries.first().copied()
    }

    /// Check if a distance would make the board
    pub fn qualifies(&self, distance: f32) -> bool {
        if !distance.is_finite() {
            return false;
        }
        if self.entries.len() < MAX_RANKING_ITEMS {
            return true;
        }
        self.entries.last().map(|&e| distance > e).unwrap_or(true)
    }

    /// Insert a distance, keep the board sorted descending and trimmed.
    /// Returns the rank achieved (1-indexed) or None if it fell off the end.
    pub fn add(&mut self, distance: f32) -> Option<usize> {
        if !distance.is_finite() {
            log::warn!("Ignoring non-finite ranking entry {distance}");
            return None;
        }

        // Ties go after existing equal entries
        let pos = self
            .entries
            .iter()
            .position(|&e| distance > e)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, distance);
        self.entries.truncate(MAX_RANKING_ITEMS);

        (pos < MAX_RANKING_ITEMS).then_some(pos + 1)
    }

    /// Parse persisted data. Anything that is not a JSON array yields an
    /// empty board; non-numeric items are dropped.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Array(items)) => {
                Self::from_values(items.iter().filter_map(|v| v.as_f64()).map(|v| v as f32))
            }
            Ok(_) => {
                log::warn!("Ranking data is not an array, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Corrupt ranking data ({e}), starting fresh");
                Self::new()
            }
        }
    }

    /// Load the leaderboard, tolerating missing or unreadable storage
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(RANKING_KEY) {
            Ok(Some(raw)) => {
                let ranking = Self::parse(&raw);
                log::info!("Loaded {} ranking entries", ranking.len());
                ranking
            }
            Ok(None) => {
                log::info!("No ranking found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Ranking storage unreadable ({e}), starting fresh");
                Self::new()
            }
        }
    }

    /// Persist the leaderboard as a JSON array
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(RANKING_KEY, &json)?;
        log::debug!("Ranking saved ({} entries)", self.entries.len());
        Ok(())
    }
}
