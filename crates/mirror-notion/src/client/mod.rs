//! Notion REST API client.
//!
//! Provides a blocking HTTP client for the Notion public API with bearer
//! token authentication.

mod blocks;
mod databases;
mod download;
mod pages;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use ureq::Agent;
use ureq::http::Response;

use crate::api::NotionApi;
use crate::error::NotionError;
use crate::types::{Download, Paginated};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Notion REST API client.
pub struct NotionClient {
    agent: Agent,
    base_url: String,
    token: String,
    version: String,
}

impl NotionClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g. `https://api.notion.com`)
    /// * `token` - integration token
    /// * `version` - value of the `Notion-Version` header
    #[must_use]
    pub fn new(base_url: &str, token: &str, version: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
            version: version.to_owned(),
        }
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Turn a response into JSON, mapping error statuses to [`NotionError::Http`].
fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T, NotionError> {
    let status = response.status().as_u16();
    let mut body_reader = response.into_body();

    if status >= 400 {
        let error_body = body_reader
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(NotionError::Http {
            status,
            body: error_body,
        });
    }

    let body = body_reader.read_to_string()?;
    Ok(serde_json::from_str(&body)?)
}

impl NotionApi for NotionClient {
    fn retrieve_page(&self, page_id: &str) -> Result<Value, NotionError> {
        self.get_page(page_id)
    }

    fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Value>, NotionError> {
        self.get_block_children(block_id, cursor)
    }

    fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        edited_since: Option<DateTime<Utc>>,
    ) -> Result<Paginated<Value>, NotionError> {
        self.post_database_query(database_id, cursor, edited_since)
    }

    fn download(&self, url: &str) -> Result<Download, NotionError> {
        self.get_asset(url)
    }
}
