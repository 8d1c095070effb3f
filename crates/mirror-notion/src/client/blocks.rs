//! Block operations for Notion API.

use serde_json::Value;
use tracing::debug;

use super::{NotionClient, read_json};
use crate::error::NotionError;
use crate::types::{PAGE_SIZE, Paginated};

impl NotionClient {
    /// List one page of a block's children.
    pub(crate) fn get_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Value>, NotionError> {
        let url = format!("{}/blocks/{}/children", self.api_url(), block_id);

        debug!("Listing children of {} (cursor={:?})", block_id, cursor);

        let mut request = self
            .agent
            .get(&url)
            .query("page_size", PAGE_SIZE.to_string())
            .header("Authorization", &self.bearer())
            .header("Notion-Version", &self.version)
            .header("Accept", "application/json");

        if let Some(cursor) = cursor {
            request = request.query("start_cursor", cursor);
        }

        read_json(request.call()?)
    }
}
