//! One sync run over a set of configured targets.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mirror_notion::NotionApi;
use tracing::info;

use crate::database::{DatabaseReport, DatabaseSyncOptions};
use crate::error::SyncError;
use crate::state::StateStore;
use crate::syncer::Syncer;

/// Something to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    /// A standalone page, stored under its alias when one is given.
    Page { id: String, alias: Option<String> },
    /// A database, stored under `name`.
    Database { id: String, name: String },
}

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Ignore the watermark and resync everything.
    pub full: bool,
    /// Fetch block trees of changed database rows.
    pub fetch_row_blocks: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Whether the run was a full sync.
    pub full: bool,
    /// Incremental lower bound used for database queries.
    pub since: Option<DateTime<Utc>>,
    /// Watermark stored for the next run.
    pub started_at: Option<DateTime<Utc>>,
    pub pages: Vec<PageOutcome>,
    pub databases: Vec<DatabaseOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Alias or id.
    pub name: String,
    /// `false` when skipped as unchanged.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOutcome {
    pub name: String,
    pub report: DatabaseReport,
}

impl RunReport {
    /// Number of pages that were refetched.
    pub fn pages_changed(&self) -> usize {
        self.pages.iter().filter(|p| p.changed).count()
    }

    /// Number of database rows that were refetched.
    pub fn rows_changed(&self) -> usize {
        self.databases.iter().map(|d| d.report.changed).sum()
    }
}

impl<A: NotionApi + ?Sized> Syncer<'_, A> {
    /// Sync every target, then persist the new state.
    ///
    /// Targets are processed in order. The first error aborts the run and
    /// leaves the stored state untouched, so everything that was not saved
    /// is retried next time. On success the watermark becomes the instant the
    /// run started, so edits made while it was running are picked up again.
    ///
    /// Targets whose names map to the same snapshot file are rejected before
    /// anything is fetched.
    pub fn run(
        &self,
        store: &StateStore,
        targets: &[SyncTarget],
        options: RunOptions,
    ) -> Result<RunReport, SyncError> {
        self.check_outputs(targets)?;
        let started_at = Utc::now();
        let mut state = store.load();
        let since = state.incremental_since();
        let full = options.full || since.is_none();

        info!(
            "starting {} sync of {} target(s)",
            if full { "full" } else { "incremental" },
            targets.len()
        );

        let mut report = RunReport {
            full,
            since: if full { None } else { since },
            started_at: Some(started_at),
            ..RunReport::default()
        };

        for target in targets {
            match target {
                SyncTarget::Page { id, alias } => {
                    let changed = self.sync_page(&mut state, id, alias.as_deref())?.is_some();
                    report.pages.push(PageOutcome {
                        name: alias.clone().unwrap_or_else(|| id.clone()),
                        changed,
                    });
                }
                SyncTarget::Database { id, name } => {
                    let db_report = self.sync_database(
                        &mut state,
                        id,
                        name,
                        DatabaseSyncOptions {
                            since: report.since,
                            full,
                            fetch_blocks: options.fetch_row_blocks,
                        },
                    )?;
                    report.databases.push(DatabaseOutcome {
                        name: name.clone(),
                        report: db_report,
                    });
                }
            }
        }

        state.last_sync_timestamp = Some(started_at);
        store.save(&state)?;
        info!(
            "sync complete: {} page(s) and {} row(s) updated",
            report.pages_changed(),
            report.rows_changed()
        );
        Ok(report)
    }

    fn check_outputs(&self, targets: &[SyncTarget]) -> Result<(), SyncError> {
        let mut seen = HashSet::new();
        for target in targets {
            let path = match target {
                SyncTarget::Page { id, alias } => {
                    self.layout.page_path(alias.as_deref().unwrap_or(id))
                }
                SyncTarget::Database { name, .. } => self.layout.database_path(name),
            };
            if seen.contains(&path) {
                return Err(SyncError::DuplicateOutput { path });
            }
            seen.insert(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::snapshot::SnapshotLayout;
    use mirror_notion::MockNotion;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, MockNotion) {
        let notion = MockNotion::new()
            .with_page(json!({"id": "p1", "last_edited_time": "2024-03-01T09:00:00.000Z"}))
            .with_row("db", json!({"id": "r1", "last_edited_time": "2024-03-01T09:00:00.000Z"}));
        (TempDir::new().unwrap(), notion)
    }

    fn targets() -> Vec<SyncTarget> {
        vec![
            SyncTarget::Page { id: "p1".to_owned(), alias: Some("home".to_owned()) },
            SyncTarget::Database { id: "db".to_owned(), name: "posts".to_owned() },
        ]
    }

    #[test]
    fn test_first_run_is_full_and_saves_watermark() {
        let (tmp, notion) = fixture();
        let store = StateStore::new(tmp.path().join("state.json"));
        let syncer = Syncer::new(&notion, SnapshotLayout::new(tmp.path()), tmp.path().join("assets"))
            .with_retry(RetryPolicy::immediate(1));

        let before = Utc::now();
        let report = syncer.run(&store, &targets(), RunOptions::default()).unwrap();

        assert!(report.full);
        assert_eq!(report.pages_changed(), 1);
        assert_eq!(report.rows_changed(), 1);
        let saved = store.load().last_sync_timestamp.unwrap();
        assert!(saved >= before && saved <= Utc::now());
        assert_eq!(Some(saved), report.started_at);
    }

    #[test]
    fn test_second_run_is_incremental() {
        let (tmp, notion) = fixture();
        let store = StateStore::new(tmp.path().join("state.json"));
        let syncer = Syncer::new(&notion, SnapshotLayout::new(tmp.path()), tmp.path().join("assets"))
            .with_retry(RetryPolicy::immediate(1));

        syncer.run(&store, &targets(), RunOptions::default()).unwrap();
        let report = syncer.run(&store, &targets(), RunOptions::default()).unwrap();

        assert!(!report.full);
        assert_eq!(report.pages_changed(), 0);
        assert_eq!(report.rows_changed(), 0);
    }

    #[test]
    fn test_forced_full_run() {
        let (tmp, notion) = fixture();
        let store = StateStore::new(tmp.path().join("state.json"));
        let syncer = Syncer::new(&notion, SnapshotLayout::new(tmp.path()), tmp.path().join("assets"))
            .with_retry(RetryPolicy::immediate(1));

        syncer.run(&store, &targets(), RunOptions::default()).unwrap();
        let report = syncer
            .run(&store, &targets(), RunOptions { full: true, ..RunOptions::default() })
            .unwrap();

        assert!(report.full);
        assert_eq!(report.since, None);
        assert_eq!(report.rows_changed(), 1);
    }

    #[test]
    fn test_failed_run_leaves_state_untouched() {
        let (tmp, notion) = fixture();
        let store = StateStore::new(tmp.path().join("state.json"));
        let syncer = Syncer::new(&notion, SnapshotLayout::new(tmp.path()), tmp.path().join("assets"))
            .with_retry(RetryPolicy::immediate(1));
        notion.fail("db");

        assert!(syncer.run(&store, &targets(), RunOptions::default()).is_err());
        assert!(!store.path().exists());
        // Work done before the failure is on disk
        assert!(tmp.path().join("pages/home.json").exists());
    }

    #[test]
    fn test_names_sharing_a_snapshot_file_are_rejected() {
        let (tmp, notion) = fixture();
        let store = StateStore::new(tmp.path().join("state.json"));
        let syncer = Syncer::new(&notion, SnapshotLayout::new(tmp.path()), tmp.path().join("assets"))
            .with_retry(RetryPolicy::immediate(1));
        let targets = [
            SyncTarget::Database { id: "db".to_owned(), name: "Posts".to_owned() },
            SyncTarget::Database { id: "db2".to_owned(), name: "posts".to_owned() },
        ];

        let err = syncer.run(&store, &targets, RunOptions::default()).unwrap_err();

        assert!(
            matches!(err, SyncError::DuplicateOutput { path } if path.ends_with("databases/posts.json"))
        );
        assert_eq!(notion.query_database_calls(), 0);
        assert!(!store.path().exists());
    }
}
