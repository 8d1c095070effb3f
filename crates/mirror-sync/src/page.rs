//! Standalone page sync.

use mirror_notion::NotionApi;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::assets::AssetKey;
use crate::block::{Block, file_url};
use crate::error::SyncError;
use crate::snapshot::write_json;
use crate::state::{PageState, SyncState};
use crate::syncer::{Syncer, last_edited};

/// On-disk form of a synced page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Page object as returned by the API, plus `cover_local`.
    pub page: Value,
    /// Full content tree.
    pub blocks: Vec<Block>,
}

impl<A: NotionApi + ?Sized> Syncer<'_, A> {
    /// Sync one standalone page if it changed since the last run.
    ///
    /// Returns `None` when the page was skipped as unchanged. The snapshot is
    /// written to `pages/<alias or id>.json` and `state` records the synced
    /// version.
    pub fn sync_page(
        &self,
        state: &mut SyncState,
        page_id: &str,
        alias: Option<&str>,
    ) -> Result<Option<PageSnapshot>, SyncError> {
        let name = alias.unwrap_or(page_id);
        let path = self.layout.page_path(name);

        let mut page = self
            .retry
            .execute(&format!("retrieve page {page_id}"), || {
                self.api.retrieve_page(page_id)
            })?;
        let edited = last_edited(&page)
            .ok_or_else(|| SyncError::invalid(page_id, "missing or invalid last_edited_time"))?;

        let prior = state.pages.get(page_id).cloned();
        if let Some(prior) = &prior
            && edited <= prior.last_modified
            && path.exists()
        {
            info!("page {name} unchanged");
            return Ok(None);
        }

        let blocks = self.fetch_tree(state, page_id)?;

        let cover_url = page.get("cover").and_then(file_url).map(str::to_owned);
        let cover = self
            .assets()
            .resolve(
                state,
                &AssetKey::cover(page_id),
                cover_url.as_deref(),
                "cover",
            )
            .or_else(|| {
                prior
                    .and_then(|p| p.cover_asset_path)
                    .filter(|path| path.exists())
            });
        if let (Some(cover), Some(object)) = (&cover, page.as_object_mut()) {
            object.insert(
                "cover_local".to_owned(),
                Value::String(cover.to_string_lossy().into_owned()),
            );
        }

        let snapshot = PageSnapshot { page, blocks };
        write_json(&path, &snapshot)?;
        debug!("wrote {}", path.display());

        state.pages.insert(
            page_id.to_owned(),
            PageState {
                last_modified: edited,
                cover_asset_path: cover,
            },
        );
        info!("page {name} synced ({} top-level block(s))", snapshot.blocks.len());
        Ok(Some(snapshot))
    }
}
