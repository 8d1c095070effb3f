//! Recursive block tree fetching.

use mirror_notion::NotionApi;
use tracing::debug;

use crate::assets::AssetKey;
use crate::block::Block;
use crate::error::SyncError;
use crate::state::SyncState;
use crate::syncer::Syncer;

/// Nesting depth at which a tree is rejected as malformed.
pub const MAX_TREE_DEPTH: usize = 256;

impl<A: NotionApi + ?Sized> Syncer<'_, A> {
    /// Fetch the complete block tree under `root_id`.
    ///
    /// Children are fetched depth-first in API order, following every
    /// pagination cursor. Image and file blocks get a `local` path in their
    /// payload when the asset cache can provide one.
    pub fn fetch_tree(&self, state: &mut SyncState, root_id: &str) -> Result<Vec<Block>, SyncError> {
        self.fetch_level(state, root_id, root_id, 0)
    }

    fn fetch_level(
        &self,
        state: &mut SyncState,
        root_id: &str,
        parent_id: &str,
        depth: usize,
    ) -> Result<Vec<Block>, SyncError> {
        if depth >= MAX_TREE_DEPTH {
            return Err(SyncError::TreeTooDeep {
                root: root_id.to_owned(),
                limit: MAX_TREE_DEPTH,
            });
        }

        let label = format!("list children of {parent_id}");
        let raw = self.collect_pages(&label, |cursor| {
            self.api.list_block_children(parent_id, cursor)
        })?;
        debug!("{parent_id}: {} block(s) at depth {depth}", raw.len());

        let mut blocks = raw
            .into_iter()
            .map(serde_json::from_value::<Block>)
            .collect::<Result<Vec<_>, _>>()?;

        for block in &mut blocks {
            if block.has_children {
                block.children = self.fetch_level(state, root_id, &block.id, depth + 1)?;
            }
            if let Some(slot) = block.kind.asset_slot() {
                let key = AssetKey::block(&block.id, slot);
                let url = block.asset_url().map(str::to_owned);
                if let Some(path) = self.assets().resolve(state, &key, url.as_deref(), slot) {
                    block.set_local(&path);
                }
            }
        }

        Ok(blocks)
    }
}
