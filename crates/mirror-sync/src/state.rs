//! Durable sync state.
//!
//! [`SyncState`] is loaded once per run, threaded through every sync call as
//! an explicit `&mut` parameter, and saved once at the very end of a
//! successful run. A run that fails part-way leaves the previous state file
//! untouched, so the next run treats the failed resources as pending again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::snapshot::{read_json, write_json};

/// Seconds subtracted from the watermark before it is used as a query
/// filter, to absorb clock skew and indexing lag on the API side.
pub const SAFETY_MARGIN_SECS: i64 = 120;

/// Everything remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncState {
    /// Start time of the last fully completed run.
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    /// Standalone pages by canonical id.
    pub pages: BTreeMap<String, PageState>,
    /// Database rows by row id. Informational only; snapshots are the merge source.
    pub db_items: BTreeMap<String, DbItemState>,
    /// Downloaded assets by asset key.
    pub assets: BTreeMap<String, AssetRecord>,
}

/// Last synced version of a standalone page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// `last_edited_time` of the synced version.
    pub last_modified: DateTime<Utc>,
    /// Local cover image, if any.
    #[serde(default)]
    pub cover_asset_path: Option<PathBuf>,
}

/// Last seen version of a database row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbItemState {
    /// `last_edited_time` of the synced version.
    pub last_modified: DateTime<Utc>,
}

/// A downloaded asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// File on disk.
    pub local_path: PathBuf,
    /// Hex SHA-256 of the content.
    pub content_hash: String,
    /// Content length.
    pub size_bytes: u64,
    /// When the file was last (re)downloaded.
    pub last_updated: DateTime<Utc>,
    /// URL the content came from. Signed URLs rotate, so this is informational.
    pub last_source_url: String,
}

impl SyncState {
    /// Lower bound for incremental queries: the watermark minus the safety
    /// margin, or `None` when no run has completed yet.
    #[must_use]
    pub fn incremental_since(&self) -> Option<DateTime<Utc>> {
        self.last_sync_timestamp
            .map(|t| t - TimeDelta::seconds(SAFETY_MARGIN_SECS))
    }
}

/// Loads and saves [`SyncState`] as a single JSON file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, falling back to an empty state.
    ///
    /// A missing or unreadable file is never fatal: it degrades to a full
    /// resync.
    pub fn load(&self) -> SyncState {
        match read_json::<SyncState>(&self.path) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!("no sync state at {}, starting fresh", self.path.display());
                SyncState::default()
            }
            Err(e) => {
                warn!(
                    "ignoring unreadable sync state at {}: {e}",
                    self.path.display()
                );
                SyncState::default()
            }
        }
    }

    /// Replace the state file with `state`.
    pub fn save(&self, state: &SyncState) -> Result<(), SyncError> {
        write_json(&self.path, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_incremental_since_subtracts_margin() {
        let state = SyncState {
            last_sync_timestamp: Some(at(10, 0)),
            ..SyncState::default()
        };
        assert_eq!(state.incremental_since(), Some(at(9, 58)));
    }

    #[test]
    fn test_incremental_since_without_watermark() {
        assert_eq!(SyncState::default().incremental_since(), None);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("state.json"));
        assert_eq!(store.load(), SyncState::default());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{\"pages\": 12").unwrap();

        assert_eq!(StateStore::new(path).load(), SyncState::default());
    }

    #[test]
    fn test_load_partial_document_fills_maps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, r#"{"lastSyncTimestamp": "2024-03-01T10:00:00Z"}"#).unwrap();

        let state = StateStore::new(path).load();
        assert_eq!(state.last_sync_timestamp, Some(at(10, 0)));
        assert!(state.pages.is_empty());
        assert!(state.db_items.is_empty());
        assert!(state.assets.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("state/sync.json"));

        let mut state = SyncState {
            last_sync_timestamp: Some(at(10, 0)),
            ..SyncState::default()
        };
        state.pages.insert(
            "p1".to_owned(),
            PageState {
                last_modified: at(9, 0),
                cover_asset_path: Some(PathBuf::from("assets/cover-1.png")),
            },
        );
        state.assets.insert(
            "page:p1:cover".to_owned(),
            AssetRecord {
                local_path: PathBuf::from("assets/cover-1.png"),
                content_hash: "ab".repeat(32),
                size_bytes: 3,
                last_updated: at(10, 0),
                last_source_url: "https://files/cover.png".to_owned(),
            },
        );

        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_serialized_field_names() {
        let state = SyncState {
            last_sync_timestamp: Some(at(10, 0)),
            ..SyncState::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("lastSyncTimestamp").is_some());
        assert!(json.get("dbItems").is_some());
    }
}
