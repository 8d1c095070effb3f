//! Incremental Notion sync engine for mirror.
//!
//! The engine mirrors a configured set of pages and databases into local
//! JSON snapshots plus a directory of downloaded assets, and remembers enough
//! between runs to skip anything that has not changed:
//!
//! - [`StateStore`] / [`SyncState`]: durable per-resource watermarks and the
//!   asset registry, saved once per successful run
//! - [`Syncer`]: page, database and block tree sync over a [`NotionApi`]
//! - [`AssetCache`]: content-addressed downloads keyed by [`AssetKey`]
//! - [`RetryPolicy`]: bounded exponential backoff around every remote call
//!
//! # Example
//!
//! ```ignore
//! use mirror_notion::NotionClient;
//! use mirror_sync::{RunOptions, SnapshotLayout, StateStore, SyncTarget, Syncer};
//!
//! let client = NotionClient::new("https://api.notion.com", "secret", "2022-06-28");
//! let syncer = Syncer::new(&client, SnapshotLayout::new("data"), "data/assets");
//! let targets = vec![SyncTarget::Database { id: db_id, name: "posts".to_owned() }];
//! let report = syncer.run(&StateStore::new("data/.sync_state.json"), &targets, RunOptions::default())?;
//! ```
//!
//! [`NotionApi`]: mirror_notion::NotionApi

mod assets;
mod block;
mod database;
mod error;
mod id;
mod page;
pub mod property;
mod retry;
mod run;
mod snapshot;
mod state;
mod syncer;
mod tree;

pub use assets::{AssetCache, AssetKey, DEFAULT_EXTENSION, content_hash, infer_extension};
pub use block::{Block, BlockKind, file_url};
pub use database::{DatabaseReport, DatabaseSnapshot, DatabaseSyncOptions};
pub use error::SyncError;
pub use id::{hyphenate, normalize_id};
pub use page::PageSnapshot;
pub use property::{PropertyKind, PropertyValue};
pub use retry::{BASE_DELAY, DEFAULT_MAX_ATTEMPTS, MAX_DELAY, RetryPolicy};
pub use run::{DatabaseOutcome, PageOutcome, RunOptions, RunReport, SyncTarget};
pub use snapshot::SnapshotLayout;
pub use state::{AssetRecord, DbItemState, PageState, SAFETY_MARGIN_SECS, StateStore, SyncState};
pub use syncer::Syncer;
pub use tree::MAX_TREE_DEPTH;
