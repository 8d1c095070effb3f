//! The sync engine handle.
//!
//! [`Syncer`] bundles the remote API, the retry policy and the output
//! locations. Its operations are spread over the modules that own them:
//! [`tree`](crate::tree), [`page`](crate::page), [`database`](crate::database)
//! and [`run`](crate::run).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mirror_notion::{NotionApi, NotionError, Paginated};
use serde_json::Value;

use crate::assets::AssetCache;
use crate::error::SyncError;
use crate::retry::RetryPolicy;
use crate::snapshot::SnapshotLayout;

/// Sync engine over a [`NotionApi`] implementation.
pub struct Syncer<'a, A: NotionApi + ?Sized> {
    pub(crate) api: &'a A,
    pub(crate) retry: RetryPolicy,
    pub(crate) layout: SnapshotLayout,
    assets_dir: PathBuf,
}

impl<'a, A: NotionApi + ?Sized> Syncer<'a, A> {
    /// Create a syncer writing snapshots under `layout` and assets into
    /// `assets_dir`, with the default retry policy.
    pub fn new(api: &'a A, layout: SnapshotLayout, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            retry: RetryPolicy::default(),
            layout,
            assets_dir: assets_dir.into(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Snapshot locations.
    pub fn layout(&self) -> &SnapshotLayout {
        &self.layout
    }

    /// Asset directory.
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub(crate) fn assets(&self) -> AssetCache<'_, A> {
        AssetCache::new(self.api, &self.retry, &self.assets_dir)
    }

    /// Drain a cursor-paginated listing, retrying each page request.
    pub(crate) fn collect_pages<F>(&self, label: &str, mut fetch: F) -> Result<Vec<Value>, SyncError>
    where
        F: FnMut(Option<&str>) -> Result<Paginated<Value>, NotionError>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .retry
                .execute(label, || fetch(cursor.as_deref()))?;
            let next = page.continuation().map(str::to_owned);
            items.extend(page.results);
            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }
    }
}

/// `last_edited_time` of a page or row.
pub(crate) fn last_edited(item: &Value) -> Option<DateTime<Utc>> {
    let raw = item.get("last_edited_time")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// `id` of a page, row or block.
pub(crate) fn item_id(item: &Value) -> Option<&str> {
    item.get("id")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mirror_notion::MockNotion;
    use serde_json::json;

    #[test]
    fn test_collect_pages_follows_cursors() {
        let children = (0..7)
            .map(|i| json!({"id": format!("b{i}"), "type": "paragraph", "paragraph": {}}))
            .collect();
        let notion = MockNotion::new()
            .with_page_size(3)
            .with_children("p1", children);
        let syncer = Syncer::new(&notion, SnapshotLayout::new("unused"), "unused");

        let items = syncer
            .collect_pages("list", |cursor| notion.list_block_children("p1", cursor))
            .unwrap();

        assert_eq!(items.len(), 7);
        assert_eq!(items[6]["id"], json!("b6"));
        assert_eq!(notion.list_block_children_calls(), 3);
    }

    #[test]
    fn test_last_edited_parses_millis() {
        let item = json!({"last_edited_time": "2024-03-01T10:00:00.000Z"});
        assert_eq!(
            last_edited(&item),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(last_edited(&json!({})), None);
    }
}
