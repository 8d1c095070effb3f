//! Database (collection) sync.
//!
//! A database snapshot is merged, not rebuilt: rows returned by the query
//! replace their previous version in place and new rows are appended, so an
//! incremental run only touches what changed. Deletions can only be seen by
//! listing every row, which happens in full mode.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use mirror_notion::NotionApi;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::assets::AssetKey;
use crate::block::file_url;
use crate::error::SyncError;
use crate::property;
use crate::snapshot::{read_json, write_json};
use crate::state::{DbItemState, SyncState};
use crate::syncer::{Syncer, item_id, last_edited};

/// On-disk form of a synced database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    #[serde(default)]
    pub results: Vec<Value>,
}

/// How to sync one database.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseSyncOptions {
    /// Only rows edited on or after this instant are queried.
    pub since: Option<DateTime<Utc>>,
    /// Query every row and drop rows that no longer exist upstream.
    pub full: bool,
    /// Attach each changed row's block tree as `blocks`.
    pub fetch_blocks: bool,
}

/// Outcome of syncing one database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseReport {
    /// Whether a full query was made.
    pub full: bool,
    /// Rows fetched and merged.
    pub changed: usize,
    /// Rows dropped because they no longer exist upstream.
    pub removed: usize,
    /// Rows in the snapshot after the merge.
    pub total: usize,
}

impl<A: NotionApi + ?Sized> Syncer<'_, A> {
    /// Sync database `database_id` into `databases/<name>.json`.
    ///
    /// Without a `since` bound, or without an existing snapshot to merge
    /// into, the database is queried in full regardless of `options.full`.
    pub fn sync_database(
        &self,
        state: &mut SyncState,
        database_id: &str,
        name: &str,
        options: DatabaseSyncOptions,
    ) -> Result<DatabaseReport, SyncError> {
        let path = self.layout.database_path(name);
        let existing = match read_json::<DatabaseSnapshot>(&path) {
            Ok(existing) => existing,
            Err(e) => {
                warn!("discarding unreadable snapshot for {name}: {e}");
                None
            }
        };

        let full = options.full || options.since.is_none() || existing.is_none();
        let since = if full { None } else { options.since };
        let mut rows = RowSet::new(existing.map(|s| s.results).unwrap_or_default());

        let changed = self.query_rows(database_id, since)?;
        let changed_count = changed.len();
        for mut row in changed {
            let Some(row_id) = item_id(&row).map(str::to_owned) else {
                return Err(SyncError::invalid(database_id, "query returned a row without id"));
            };
            debug!(
                "{name}: row {row_id} ({})",
                property::title(&row).unwrap_or_default()
            );

            self.resolve_row_assets(state, &row_id, &mut row);
            if options.fetch_blocks {
                let blocks = self.fetch_tree(state, &row_id)?;
                if let Some(object) = row.as_object_mut() {
                    object.insert("blocks".to_owned(), serde_json::to_value(blocks)?);
                }
            }
            if let Some(edited) = last_edited(&row) {
                state
                    .db_items
                    .insert(row_id.clone(), DbItemState { last_modified: edited });
            }
            rows.upsert(row_id, row);
        }

        let mut removed = 0;
        if full {
            let live = self.live_row_ids(database_id)?;
            for gone in rows.retain(&live) {
                state.db_items.remove(&gone);
                removed += 1;
            }
        }

        let results = rows.into_results();
        let report = DatabaseReport {
            full,
            changed: changed_count,
            removed,
            total: results.len(),
        };
        write_json(&path, &DatabaseSnapshot { results })?;

        info!(
            "database {name}: {} changed, {} removed, {} total{}",
            report.changed,
            report.removed,
            report.total,
            if full { " (full)" } else { "" }
        );
        Ok(report)
    }

    fn query_rows(
        &self,
        database_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Value>, SyncError> {
        let label = format!("query database {database_id}");
        self.collect_pages(&label, |cursor| {
            self.api.query_database(database_id, cursor, since)
        })
    }

    /// Ids of every row currently in the database.
    fn live_row_ids(&self, database_id: &str) -> Result<HashSet<String>, SyncError> {
        Ok(self
            .query_rows(database_id, None)?
            .iter()
            .filter_map(item_id)
            .map(str::to_owned)
            .collect())
    }

    /// Mirror the row's cover and every files-property entry, recording the
    /// local paths inline (`cover_local` and per-entry `local`).
    fn resolve_row_assets(&self, state: &mut SyncState, row_id: &str, row: &mut Value) {
        let assets = self.assets();

        let cover_url = row.get("cover").and_then(file_url).map(str::to_owned);
        let cover = assets.resolve(
            state,
            &AssetKey::cover(row_id),
            cover_url.as_deref(),
            "cover",
        );

        let Some(object) = row.as_object_mut() else {
            return;
        };
        if let Some(cover) = cover {
            object.insert(
                "cover_local".to_owned(),
                Value::String(cover.to_string_lossy().into_owned()),
            );
        }

        let Some(properties) = object.get_mut("properties").and_then(Value::as_object_mut) else {
            return;
        };
        for (prop_name, prop) in properties.iter_mut() {
            let Some(files) = property::files_mut(prop) else {
                continue;
            };
            for (index, file) in files.iter_mut().enumerate() {
                let url = file_url(file).map(str::to_owned);
                let local = assets.resolve(
                    state,
                    &AssetKey::property(row_id, prop_name, index),
                    url.as_deref(),
                    prop_name,
                );
                if let (Some(local), Some(entry)) = (local, file.as_object_mut()) {
                    entry.insert(
                        "local".to_owned(),
                        Value::String(local.to_string_lossy().into_owned()),
                    );
                }
            }
        }
    }
}

/// Snapshot rows keyed by id, preserving first-seen order.
struct RowSet {
    order: Vec<String>,
    rows: HashMap<String, Value>,
}

impl RowSet {
    fn new(existing: Vec<Value>) -> Self {
        let mut set = Self {
            order: Vec::with_capacity(existing.len()),
            rows: HashMap::with_capacity(existing.len()),
        };
        for row in existing {
            match item_id(&row).map(str::to_owned) {
                Some(id) => set.upsert(id, row),
                None => warn!("dropping snapshot row without id"),
            }
        }
        set
    }

    fn upsert(&mut self, id: String, row: Value) {
        if !self.rows.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.rows.insert(id, row);
    }

    /// Keep only rows in `live`, returning the ids of the dropped ones.
    fn retain(&mut self, live: &HashSet<String>) -> Vec<String> {
        let (kept, gone): (Vec<_>, Vec<_>) =
            self.order.drain(..).partition(|id| live.contains(id));
        for id in &gone {
            self.rows.remove(id);
        }
        self.order = kept;
        gone
    }

    fn into_results(mut self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|id| self.rows.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::snapshot::SnapshotLayout;
    use chrono::TimeZone;
    use mirror_notion::MockNotion;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    const DB: &str = "db";

    fn row(id: &str, edited: &str, title: &str) -> Value {
        json!({
            "object": "page",
            "id": id,
            "last_edited_time": edited,
            "properties": {
                "Name": {"type": "title", "title": [{"plain_text": title}]}
            }
        })
    }

    fn syncer<'a>(notion: &'a MockNotion, tmp: &TempDir) -> Syncer<'a, MockNotion> {
        Syncer::new(notion, SnapshotLayout::new(tmp.path()), tmp.path().join("assets"))
            .with_retry(RetryPolicy::immediate(2))
    }

    fn snapshot(tmp: &TempDir) -> DatabaseSnapshot {
        serde_json::from_slice(&std::fs::read(tmp.path().join("databases/posts.json")).unwrap())
            .unwrap()
    }

    fn titles(snapshot: &DatabaseSnapshot) -> Vec<String> {
        snapshot
            .results
            .iter()
            .map(|r| property::title(r).unwrap())
            .collect()
    }

    fn since() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_first_sync_is_full() {
        let tmp = TempDir::new().unwrap();
        let notion = MockNotion::new()
            .with_row(DB, row("a", "2024-03-01T09:00:00.000Z", "A"))
            .with_row(DB, row("b", "2024-03-01T09:00:00.000Z", "B"));
        let mut state = SyncState::default();

        let report = syncer(&notion, &tmp)
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions { since: since(), ..Default::default() })
            .unwrap();

        assert!(report.full);
        assert_eq!((report.changed, report.total), (2, 2));
        assert_eq!(notion.query_filters(), vec![None, None]);
        assert_eq!(titles(&snapshot(&tmp)), vec!["A", "B"]);
        assert_eq!(state.db_items.len(), 2);
    }

    #[test]
    fn test_incremental_merges_in_place() {
        let tmp = TempDir::new().unwrap();
        let notion = MockNotion::new()
            .with_row(DB, row("a", "2024-03-01T09:00:00.000Z", "A"))
            .with_row(DB, row("b", "2024-03-01T09:00:00.000Z", "B"));
        let syncer = syncer(&notion, &tmp);
        let mut state = SyncState::default();
        syncer
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions::default())
            .unwrap();

        notion.put_row(DB, row("a", "2024-03-01T10:30:00.000Z", "A2"));
        notion.put_row(DB, row("c", "2024-03-01T10:30:00.000Z", "C"));
        let report = syncer
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions { since: since(), ..Default::default() })
            .unwrap();

        assert!(!report.full);
        assert_eq!((report.changed, report.removed, report.total), (2, 0, 3));
        assert_eq!(titles(&snapshot(&tmp)), vec!["A2", "B", "C"]);
        assert_eq!(notion.query_filters().last(), Some(&since()));
    }

    #[test]
    fn test_incremental_keeps_deleted_rows() {
        let tmp = TempDir::new().unwrap();
        let notion = MockNotion::new()
            .with_row(DB, row("a", "2024-03-01T09:00:00.000Z", "A"))
            .with_row(DB, row("b", "2024-03-01T09:00:00.000Z", "B"));
        let syncer = syncer(&notion, &tmp);
        let mut state = SyncState::default();
        syncer
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions::default())
            .unwrap();

        notion.remove_row(DB, "b");
        syncer
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions { since: since(), ..Default::default() })
            .unwrap();
        assert_eq!(titles(&snapshot(&tmp)), vec!["A", "B"]);

        let report = syncer
            .sync_database(
                &mut state,
                DB,
                "posts",
                DatabaseSyncOptions { since: since(), full: true, ..Default::default() },
            )
            .unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(titles(&snapshot(&tmp)), vec!["A"]);
        assert!(!state.db_items.contains_key("b"));
    }

    #[test]
    fn test_file_property_and_cover_assets() {
        let tmp = TempDir::new().unwrap();
        let mut r = row("a", "2024-03-01T09:00:00.000Z", "A");
        r["cover"] = json!({"type": "external", "external": {"url": "https://cdn/cover.jpg"}});
        r["properties"]["Files"] = json!({"type": "files", "files": [
            {"name": "doc.pdf", "type": "file", "file": {"url": "https://files/doc.pdf?sig=1"}},
            {"name": "gone.png", "type": "file", "file": {"url": "https://files/gone.png"}}
        ]});
        let notion = MockNotion::new()
            .with_row(DB, r)
            .with_asset("https://cdn/cover.jpg", b"cover")
            .with_asset("https://files/doc.pdf?sig=1", b"%PDF");
        let mut state = SyncState::default();

        syncer(&notion, &tmp)
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions::default())
            .unwrap();

        let row = &snapshot(&tmp).results[0];
        assert!(row["cover_local"].as_str().unwrap().ends_with(".jpg"));
        assert!(row["properties"]["Files"]["files"][0]["local"].as_str().unwrap().ends_with(".pdf"));
        assert_eq!(row["properties"]["Files"]["files"][1].get("local"), None);
        assert!(state.assets.contains_key("page:a:prop:Files:0"));
        assert!(state.assets.contains_key("page:a:cover"));
    }

    #[test]
    fn test_row_blocks_on_request() {
        let tmp = TempDir::new().unwrap();
        let notion = MockNotion::new()
            .with_row(DB, row("a", "2024-03-01T09:00:00.000Z", "A"))
            .with_children("a", vec![json!({"id": "b1", "type": "paragraph", "paragraph": {}})]);
        let mut state = SyncState::default();

        syncer(&notion, &tmp)
            .sync_database(
                &mut state,
                DB,
                "posts",
                DatabaseSyncOptions { fetch_blocks: true, ..Default::default() },
            )
            .unwrap();

        assert_eq!(snapshot(&tmp).results[0]["blocks"][0]["id"], json!("b1"));
    }

    #[test]
    fn test_unknown_database_fails() {
        let tmp = TempDir::new().unwrap();
        let notion = MockNotion::new();
        let mut state = SyncState::default();

        let err = syncer(&notion, &tmp)
            .sync_database(&mut state, DB, "posts", DatabaseSyncOptions::default())
            .unwrap_err();

        assert!(matches!(err, SyncError::RetriesExhausted { .. }));
        assert!(!tmp.path().join("databases/posts.json").exists());
    }

    #[test]
    fn test_row_set_order() {
        let mut rows = RowSet::new(vec![json!({"id": "x"}), json!({"id": "y"}), json!({})]);
        rows.upsert("z".to_owned(), json!({"id": "z"}));
        rows.upsert("x".to_owned(), json!({"id": "x", "v": 2}));
        let gone = rows.retain(&["x", "z"].iter().map(|s| (*s).to_owned()).collect());

        assert_eq!(gone, vec!["y".to_owned()]);
        assert_eq!(
            rows.into_results(),
            vec![json!({"id": "x", "v": 2}), json!({"id": "z"})]
        );
    }
}
