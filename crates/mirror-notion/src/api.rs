//! The remote capability seam used by the sync engine.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::NotionError;
use crate::types::{Download, Paginated};

/// Remote operations the sync engine depends on.
///
/// Every method performs exactly one request. Pagination and retry are the
/// caller's business.
pub trait NotionApi: Send + Sync {
    /// Fetch a page object (metadata and properties, no content).
    fn retrieve_page(&self, page_id: &str) -> Result<Value, NotionError>;

    /// List one page of a block's direct children.
    fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Value>, NotionError>;

    /// Query one page of database rows.
    ///
    /// With `edited_since` set, only rows whose `last_edited_time` is on or
    /// after that instant are returned.
    fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        edited_since: Option<DateTime<Utc>>,
    ) -> Result<Paginated<Value>, NotionError>;

    /// Download an asset by direct URL, without API credentials.
    fn download(&self, url: &str) -> Result<Download, NotionError>;
}
