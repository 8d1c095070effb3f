//! `mirror status` command implementation.

use std::path::PathBuf;

use clap::Args;
use mirror_config::Config;
use mirror_sync::{StateStore, SyncState, hyphenate, normalize_id};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the status command.
#[derive(Args)]
pub(crate) struct StatusArgs {
    /// Path to configuration file (default: auto-discover mirror.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl StatusArgs {
    /// Execute the status command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let store = StateStore::new(&config.output_resolved.state_file);
        let state = store.load();

        output.heading(&format!("State: {}", store.path().display()));
        match state.last_sync_timestamp {
            Some(at) => output.info(&format!("Last sync: {}", at.to_rfc3339())),
            None => output.warning("Never synced; the next run will be a full sync"),
        }
        if let Some(since) = state.incremental_since() {
            output.info(&format!("Next run queries changes since {}", since.to_rfc3339()));
        }

        for page in &config.pages {
            let Some(id) = page.id.as_deref().and_then(normalize_id) else {
                continue;
            };
            let name = page.alias.clone().unwrap_or_else(|| hyphenate(&id));
            match state.pages.get(&id) {
                Some(synced) => output.info(&format!(
                    "  page {name}: edited {}",
                    synced.last_modified.to_rfc3339()
                )),
                None => output.muted(&format!("  page {name}: not synced yet")),
            }
        }

        output.info(&summary(&state));
        Ok(())
    }
}

fn summary(state: &SyncState) -> String {
    let asset_bytes: u64 = state.assets.values().map(|a| a.size_bytes).sum();
    format!(
        "{} page(s), {} database row(s), {} asset(s) ({})",
        state.pages.len(),
        state.db_items.len(),
        state.assets.len(),
        format_bytes(asset_bytes)
    )
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
