//! Notion response envelopes.

use serde::{Deserialize, Serialize};

/// Page size used for every paginated endpoint (the API maximum).
pub const PAGE_SIZE: usize = 100;

/// Paginated list envelope shared by block children and database queries.
///
/// Only the pagination fields are modelled; items stay as raw JSON so that
/// fields the sync engine does not know about survive into snapshots.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Paginated<T> {
    /// Items on this page, in API order.
    pub results: Vec<T>,
    /// Whether another page follows.
    #[serde(default)]
    pub has_more: bool,
    /// Cursor for the next page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    /// Cursor to request next, or `None` when the listing is complete.
    #[must_use]
    pub fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref()
        } else {
            None
        }
    }
}

/// Result of a plain asset download.
///
/// A non-2xx status is reported here rather than as an error, because a
/// missing asset is an expected, recoverable outcome for callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// HTTP status code.
    pub status: u16,
    /// Response body (empty for error statuses).
    pub bytes: Vec<u8>,
}

impl Download {
    /// Whether the server answered with a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
