//! Notion API access for mirror.
//!
//! The [`NotionApi`] trait is the only way the sync engine talks to the
//! outside world. It covers the four remote capabilities the engine needs:
//!
//! - page metadata (`GET /v1/pages/{id}`)
//! - block children listing (`GET /v1/blocks/{id}/children`)
//! - database queries with an optional last-edited filter
//!   (`POST /v1/databases/{id}/query`)
//! - plain asset downloads by URL
//!
//! [`NotionClient`] implements it over a blocking `ureq` agent.
//! [`MockNotion`] (behind the `mock` feature) implements it in memory for tests.

mod api;
mod client;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod types;

pub use api::NotionApi;
pub use client::NotionClient;
pub use error::NotionError;
#[cfg(feature = "mock")]
pub use mock::MockNotion;
pub use types::{Download, PAGE_SIZE, Paginated};
