//! Page operations for Notion API.

use serde_json::Value;
use tracing::debug;

use super::{NotionClient, read_json};
use crate::error::NotionError;

impl NotionClient {
    /// Get a page object by ID.
    pub(crate) fn get_page(&self, page_id: &str) -> Result<Value, NotionError> {
        let url = format!("{}/pages/{}", self.api_url(), page_id);

        debug!("Getting page {}", page_id);

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer())
            .header("Notion-Version", &self.version)
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
    }
}
