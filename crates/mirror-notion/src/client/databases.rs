//! Database operations for Notion API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::debug;

use super::{NotionClient, read_json};
use crate::error::NotionError;
use crate::types::{PAGE_SIZE, Paginated};

impl NotionClient {
    /// Query one page of database rows.
    pub(crate) fn post_database_query(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        edited_since: Option<DateTime<Utc>>,
    ) -> Result<Paginated<Value>, NotionError> {
        let url = format!("{}/databases/{}/query", self.api_url(), database_id);
        let payload = query_payload(cursor, edited_since);

        debug!(
            "Querying database {} (cursor={:?}, since={:?})",
            database_id, cursor, edited_since
        );

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .header("Notion-Version", &self.version)
            .header("Accept", "application/json")
            .send_json(&payload)?;

        read_json(response)
    }
}

/// Build the query body, including the inclusive last-edited filter.
fn query_payload(cursor: Option<&str>, edited_since: Option<DateTime<Utc>>) -> Value {
    let mut payload = json!({ "page_size": PAGE_SIZE });

    if let Some(cursor) = cursor {
        payload["start_cursor"] = json!(cursor);
    }

    if let Some(since) = edited_since {
        payload["filter"] = json!({
            "timestamp": "last_edited_time",
            "last_edited_time": {
                "on_or_after": since.to_rfc3339_opts(SecondsFormat::Millis, true)
            }
        });
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_payload_unfiltered() {
        assert_eq!(query_payload(None, None), json!({ "page_size": 100 }));
    }

    #[test]
    fn test_query_payload_with_cursor_and_filter() {
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 9, 58, 0).unwrap();
        let payload = query_payload(Some("abc"), Some(since));

        assert_eq!(
            payload,
            json!({
                "page_size": 100,
                "start_cursor": "abc",
                "filter": {
                    "timestamp": "last_edited_time",
                    "last_edited_time": { "on_or_after": "2024-03-01T09:58:00.000Z" }
                }
            })
        );
    }
}
