//! Boundary to the locally stored bars and screenings.

use crate::{Bar, Screening};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid snapshot {path}: {source}")]
    Format { path: String, source: serde_json::Error },
}

/// Read side of the screening database. Results are ordered by screening time.
#[async_trait]
pub trait ScreeningStore: Send + Sync {
    async fn all_screenings(&self) -> Result<Vec<Screening>, StoreError>;

    async fn screenings_for_game(&self, game_id: &str) -> Result<Vec<Screening>, StoreError>;

    async fn screenings_for_bar(&self, bar_id: i64) -> Result<Vec<Screening>, StoreError>;

    /// Screenings strictly after `after`.
    async fn upcoming_screenings(&self, after: DateTime<Utc>) -> Result<Vec<Screening>, StoreError>;

    /// Each bar with at least one screening of the game, once.
    async fn bars_showing_game(&self, game_id: &str) -> Result<Vec<Bar>, StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub screenings: Vec<Screening>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Format { path: display, source })
    }
}

/// Snapshot-backed store for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bars: Vec<Bar>,
    screenings: Vec<Screening>,
}

impl MemoryStore {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut screenings = snapshot.screenings;
        screenings.sort_by_key(|s| s.screening_time);
        Self { bars: snapshot.bars, screenings }
    }

    fn select(&self, keep: impl Fn(&Screening) -> bool) -> Vec<Screening> {
        self.screenings.iter().filter(|s| keep(s)).cloned().collect()
    }
}

#[async_trait]
impl ScreeningStore for MemoryStore {
    async fn all_screenings(&self) -> Result<Vec<Screening>, StoreError> {
        Ok(self.screenings.clone())
    }

    async fn screenings_for_game(&self, game_id: &str) -> Result<Vec<Screening>, StoreError> {
        Ok(self.select(|s| s.external_game_id.as_deref() == Some(game_id)))
    }

    async fn screenings_for_bar(&self, bar_id: i64) -> Result<Vec<Screening>, StoreError> {
        Ok(self.select(|s| s.bar_id == bar_id))
    }

    async fn upcoming_screenings(&self, after: DateTime<Utc>) -> Result<Vec<Screening>, StoreError> {
        Ok(self.select(|s| s.screening_time > after))
    }

    async fn bars_showing_game(&self, game_id: &str) -> Result<Vec<Bar>, StoreError> {
        let bar_ids: HashSet<i64> = self
            .screenings
            .iter()
            .filter(|s| s.external_game_id.as_deref() == Some(game_id))
            .map(|s| s.bar_id)
            .collect();
        Ok(self
            .bars
            .iter()
            .filter(|bar| bar_ids.contains(&bar.id))
            .cloned()
            .collect())
    }
}
