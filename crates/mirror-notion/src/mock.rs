//! Mock Notion API for testing.
//!
//! Provides [`MockNotion`] for exercising sync logic without network access.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::NotionApi;
use crate::error::NotionError;
use crate::types::{Download, PAGE_SIZE, Paginated};

/// Notion accepts ids with or without hyphens, in any case.
fn key(id: &str) -> String {
    id.replace('-', "").to_ascii_lowercase()
}

fn item_id(item: &Value) -> String {
    item.get("id").and_then(Value::as_str).map(key).unwrap_or_default()
}

fn edited_at(item: &Value) -> Option<DateTime<Utc>> {
    let raw = item.get("last_edited_time")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Per-operation call counters.
#[derive(Debug, Default)]
struct Calls {
    retrieve_page: AtomicUsize,
    list_block_children: AtomicUsize,
    query_database: AtomicUsize,
    download: AtomicUsize,
}

/// In-memory Notion workspace.
///
/// Pages, block children, database rows and asset bodies are registered up
/// front with the `with_*` builders, and can be changed between sync runs
/// with the `put_*`/`remove_*` methods to simulate upstream edits.
///
/// # Example
///
/// ```ignore
/// use mirror_notion::{MockNotion, NotionApi};
/// use serde_json::json;
///
/// let notion = MockNotion::new()
///     .with_page(json!({"id": "p1", "last_edited_time": "2024-01-01T00:00:00.000Z"}))
///     .with_children("p1", vec![json!({"id": "b1", "type": "paragraph", "paragraph": {}})]);
///
/// let children = notion.list_block_children("p1", None).unwrap();
/// assert_eq!(children.results.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockNotion {
    pages: RwLock<HashMap<String, Value>>,
    children: RwLock<HashMap<String, Vec<Value>>>,
    rows: RwLock<HashMap<String, Vec<Value>>>,
    assets: RwLock<HashMap<String, Vec<u8>>>,
    failing: RwLock<HashSet<String>>,
    queries: RwLock<Vec<Option<DateTime<Utc>>>>,
    page_size: usize,
    calls: Calls,
}

impl Default for MockNotion {
    fn default() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            children: RwLock::new(HashMap::new()),
            rows: RwLock::new(HashMap::new()),
            assets: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            queries: RwLock::new(Vec::new()),
            page_size: PAGE_SIZE,
            calls: Calls::default(),
        }
    }
}

impl MockNotion {
    /// Create an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve lists in pages of `size` items to exercise cursor handling.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Register a page object (keyed by its `id`).
    #[must_use]
    pub fn with_page(self, page: Value) -> Self {
        self.put_page(page);
        self
    }

    /// Register the direct children of a page or block.
    #[must_use]
    pub fn with_children(self, parent_id: &str, children: Vec<Value>) -> Self {
        self.put_children(parent_id, children);
        self
    }

    /// Register a database row.
    #[must_use]
    pub fn with_row(self, database_id: &str, row: Value) -> Self {
        self.put_row(database_id, row);
        self
    }

    /// Register an asset body served at `url`.
    #[must_use]
    pub fn with_asset(self, url: &str, bytes: &[u8]) -> Self {
        self.put_asset(url, bytes);
        self
    }

    /// Insert or replace a page object.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn put_page(&self, page: Value) {
        self.pages.write().unwrap().insert(item_id(&page), page);
    }

    /// Replace the children of a page or block.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn put_children(&self, parent_id: &str, children: Vec<Value>) {
        self.children.write().unwrap().insert(key(parent_id), children);
    }

    /// Insert a row, or replace the row with the same `id` in place.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn put_row(&self, database_id: &str, row: Value) {
        let mut rows = self.rows.write().unwrap();
        let rows = rows.entry(key(database_id)).or_default();
        let id = item_id(&row);
        match rows.iter_mut().find(|r| item_id(r) == id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    /// Delete a row, as if it was archived upstream.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_row(&self, database_id: &str, row_id: &str) {
        if let Some(rows) = self.rows.write().unwrap().get_mut(&key(database_id)) {
            rows.retain(|r| item_id(r) != key(row_id));
        }
    }

    /// Serve `bytes` at `url`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn put_asset(&self, url: &str, bytes: &[u8]) {
        self.assets
            .write()
            .unwrap()
            .insert(url.to_owned(), bytes.to_vec());
    }

    /// Make every call touching `id` (page, block, database or asset URL) fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail(&self, id: &str) {
        self.failing.write().unwrap().insert(key(id));
    }

    /// Undo [`fail`](Self::fail).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn recover(&self, id: &str) {
        self.failing.write().unwrap().remove(&key(id));
    }

    /// Number of `retrieve_page` calls so far.
    pub fn retrieve_page_calls(&self) -> usize {
        self.calls.retrieve_page.load(Ordering::SeqCst)
    }

    /// Number of `list_block_children` calls so far.
    pub fn list_block_children_calls(&self) -> usize {
        self.calls.list_block_children.load(Ordering::SeqCst)
    }

    /// Number of `query_database` calls so far.
    pub fn query_database_calls(&self) -> usize {
        self.calls.query_database.load(Ordering::SeqCst)
    }

    /// Number of `download` calls so far.
    pub fn download_calls(&self) -> usize {
        self.calls.download.load(Ordering::SeqCst)
    }

    /// The `edited_since` filter of every database query, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn query_filters(&self) -> Vec<Option<DateTime<Utc>>> {
        self.queries.read().unwrap().clone()
    }

    fn check(&self, id: &str) -> Result<(), NotionError> {
        if self.failing.read().unwrap().contains(&key(id)) {
            return Err(NotionError::Mock(format!("injected failure for {id}")));
        }
        Ok(())
    }

    /// Slice `items` into one page starting at the numeric cursor.
    fn paginate(&self, items: Vec<Value>, cursor: Option<&str>) -> Paginated<Value> {
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let has_more = end < items.len();
        Paginated {
            results: items.into_iter().skip(start).take(end.saturating_sub(start)).collect(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        }
    }
}

impl NotionApi for MockNotion {
    fn retrieve_page(&self, page_id: &str) -> Result<Value, NotionError> {
        self.calls.retrieve_page.fetch_add(1, Ordering::SeqCst);
        self.check(page_id)?;
        self.pages
            .read()
            .unwrap()
            .get(&key(page_id))
            .cloned()
            .ok_or_else(|| NotionError::Http {
                status: 404,
                body: format!("page {page_id} not found"),
            })
    }

    fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Value>, NotionError> {
        self.calls.list_block_children.fetch_add(1, Ordering::SeqCst);
        self.check(block_id)?;
        let items = self
            .children
            .read()
            .unwrap()
            .get(&key(block_id))
            .cloned()
            .unwrap_or_default();
        Ok(self.paginate(items, cursor))
    }

    fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        edited_since: Option<DateTime<Utc>>,
    ) -> Result<Paginated<Value>, NotionError> {
        self.calls.query_database.fetch_add(1, Ordering::SeqCst);
        self.queries.write().unwrap().push(edited_since);
        self.check(database_id)?;

        let rows = self
            .rows
            .read()
            .unwrap()
            .get(&key(database_id))
            .cloned()
            .ok_or_else(|| NotionError::Http {
                status: 404,
                body: format!("database {database_id} not found"),
            })?;

        let matching = rows
            .into_iter()
            .filter(|row| match edited_since {
                Some(since) => edited_at(row).is_some_and(|t| t >= since),
                None => true,
            })
            .collect();

        Ok(self.paginate(matching, cursor))
    }

    fn download(&self, url: &str) -> Result<Download, NotionError> {
        self.calls.download.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().unwrap().contains(&key(url)) {
            return Err(NotionError::Mock(format!("injected failure for {url}")));
        }
        Ok(match self.assets.read().unwrap().get(url) {
            Some(bytes) => Download {
                status: 200,
                bytes: bytes.clone(),
            },
            None => Download {
                status: 404,
                bytes: Vec::new(),
            },
        })
    }
}
