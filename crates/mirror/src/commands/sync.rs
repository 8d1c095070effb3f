//! `mirror sync` command implementation.

use std::path::PathBuf;

use clap::Args;
use mirror_config::{CliSettings, Config};
use mirror_notion::NotionClient;
use mirror_sync::{
    RetryPolicy, RunOptions, RunReport, SnapshotLayout, StateStore, SyncTarget, Syncer,
    normalize_id,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    /// Ignore the last sync time, refetch everything and drop deleted rows.
    #[arg(long)]
    full: bool,

    /// Also fetch the block content of changed database rows.
    #[arg(long)]
    fetch_row_blocks: bool,

    /// Snapshot output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mirror.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl SyncArgs {
    /// Execute the sync command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the sync fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            full: self.full.then_some(true),
            fetch_row_blocks: self.fetch_row_blocks.then_some(true),
            output_dir: self.output_dir,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let token = config.require_token()?;

        let (targets, skipped) = collect_targets(&config);
        for reason in &skipped {
            output.warning(&format!("Skipping {reason}"));
        }
        if targets.is_empty() {
            output.warning("Nothing to sync: no pages or databases configured");
            return Ok(());
        }

        let client = NotionClient::new(&config.notion.base_url, &token, &config.notion.version);
        let retry = RetryPolicy::default().with_max_attempts(config.sync.max_attempts);
        let syncer = Syncer::new(
            &client,
            SnapshotLayout::new(&config.output_resolved.dir),
            &config.output_resolved.assets_dir,
        )
        .with_retry(retry);
        let store = StateStore::new(&config.output_resolved.state_file);

        output.info(&format!(
            "Syncing {} target(s) into {}...",
            targets.len(),
            config.output_resolved.dir.display()
        ));
        let report = syncer.run(
            &store,
            &targets,
            RunOptions {
                full: config.sync.full,
                fetch_row_blocks: config.sync.fetch_row_blocks,
            },
        )?;
        print_report(&output, &report);

        Ok(())
    }
}

/// Turn configured entries into sync targets.
///
/// Entries without an id or with an id that does not parse are skipped with
/// a reason instead of failing the whole run.
fn collect_targets(config: &Config) -> (Vec<SyncTarget>, Vec<String>) {
    let mut targets = Vec::new();
    let mut skipped = Vec::new();

    for (i, page) in config.pages.iter().enumerate() {
        let label = page.alias.clone().unwrap_or_else(|| format!("pages[{i}]"));
        match page.id.as_deref().map(|raw| (raw, normalize_id(raw))) {
            None => skipped.push(format!("page {label}: no id configured")),
            Some((raw, None)) => skipped.push(format!("page {label}: invalid id '{raw}'")),
            Some((_, Some(id))) => targets.push(SyncTarget::Page {
                id,
                alias: page.alias.clone(),
            }),
        }
    }

    for database in &config.databases {
        let name = &database.name;
        match database.id.as_deref().map(|raw| (raw, normalize_id(raw))) {
            None => skipped.push(format!("database {name}: no id configured")),
            Some((raw, None)) => skipped.push(format!("database {name}: invalid id '{raw}'")),
            Some((_, Some(id))) => targets.push(SyncTarget::Database {
                id,
                name: name.clone(),
            }),
        }
    }

    (targets, skipped)
}

fn print_report(output: &Output, report: &RunReport) {
    output.heading(if report.full {
        "\nFull sync"
    } else {
        "\nIncremental sync"
    });
    if let Some(since) = report.since {
        output.info(&format!("Changes since {}", since.to_rfc3339()));
    }

    for page in &report.pages {
        if page.changed {
            output.info(&format!("  page {}: updated", page.name));
        } else {
            output.muted(&format!("  page {}: unchanged", page.name));
        }
    }
    for database in &report.databases {
        let r = &database.report;
        let line = format!(
            "  database {}: {} changed, {} removed, {} total",
            database.name, r.changed, r.removed, r.total
        );
        if r.changed == 0 && r.removed == 0 {
            output.muted(&line);
        } else {
            output.info(&line);
        }
    }

    output.success(&format!(
        "\nDone: {} page(s) and {} row(s) updated",
        report.pages_changed(),
        report.rows_changed()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_config::{DatabaseEntry, PageEntry};
    use pretty_assertions::assert_eq;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_collect_targets_normalizes_ids() {
        let mut config = Config::default();
        config.pages.push(PageEntry {
            id: Some(format!("https://www.notion.so/Team-Wiki-{ID}")),
            alias: Some("wiki".to_owned()),
        });
        config.databases.push(DatabaseEntry {
            id: Some("01234567-89AB-CDEF-0123-456789ABCDEF".to_owned()),
            name: "posts".to_owned(),
        });

        let (targets, skipped) = collect_targets(&config);

        assert!(skipped.is_empty());
        assert_eq!(
            targets,
            vec![
                SyncTarget::Page {
                    id: ID.to_owned(),
                    alias: Some("wiki".to_owned())
                },
                SyncTarget::Database {
                    id: ID.to_owned(),
                    name: "posts".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_collect_targets_skips_missing_and_invalid() {
        let mut config = Config::default();
        config.pages.push(PageEntry {
            id: None,
            alias: Some("draft".to_owned()),
        });
        config.pages.push(PageEntry {
            id: Some("not-an-id".to_owned()),
            alias: None,
        });
        config.databases.push(DatabaseEntry {
            id: None,
            name: "posts".to_owned(),
        });

        let (targets, skipped) = collect_targets(&config);

        assert!(targets.is_empty());
        assert_eq!(
            skipped,
            vec![
                "page draft: no id configured".to_owned(),
                "page pages[1]: invalid id 'not-an-id'".to_owned(),
                "database posts: no id configured".to_owned(),
            ]
        );
    }
}
