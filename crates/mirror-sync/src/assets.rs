//! Content-addressed asset cache.
//!
//! Remote files (block images and files, page covers, file properties) are
//! mirrored into a flat directory. Upstream file URLs are signed and rotate
//! on every API read, so a cache entry is identified by a stable
//! [`AssetKey`] derived from where the asset appears, never by its URL.
//!
//! File names embed a prefix of the content hash:
//! `{hint}-{sha256[..16]}.{ext}`. Identical bytes under the same hint map to
//! the same file, which is written once and never overwritten or deleted.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mirror_notion::NotionApi;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use crate::retry::RetryPolicy;
use crate::snapshot::{file_stem, write_bytes};
use crate::state::{AssetRecord, SyncState};

/// Extension used when none can be inferred from the URL.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Hex characters of the content hash embedded in file names.
const HASH_PREFIX_LEN: usize = 16;

const MAX_EXTENSION_LEN: usize = 5;

/// Stable identity of an asset slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey(String);

impl AssetKey {
    /// File attached to a block, `slot` being `image` or `file`.
    #[must_use]
    pub fn block(block_id: &str, slot: &str) -> Self {
        Self(format!("block:{block_id}:{slot}"))
    }

    /// Cover image of a page or database row.
    #[must_use]
    pub fn cover(page_id: &str) -> Self {
        Self(format!("page:{page_id}:cover"))
    }

    /// `index`-th entry of a files property.
    #[must_use]
    pub fn property(page_id: &str, property: &str, index: usize) -> Self {
        Self(format!("page:{page_id}:prop:{property}:{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves asset keys to local files, downloading on a miss.
pub struct AssetCache<'a, A: NotionApi + ?Sized> {
    api: &'a A,
    retry: &'a RetryPolicy,
    dir: &'a Path,
}

impl<'a, A: NotionApi + ?Sized> AssetCache<'a, A> {
    pub fn new(api: &'a A, retry: &'a RetryPolicy, dir: &'a Path) -> Self {
        Self { api, retry, dir }
    }

    /// Local path for `key`, downloading from `source_url` if needed.
    ///
    /// A recorded file that still exists is reused without any network
    /// access, whatever the current URL. Without a URL, or when the download
    /// fails, the previously cached file (if still on disk) is returned.
    /// Failures are logged and never propagate.
    pub fn resolve(
        &self,
        state: &mut SyncState,
        key: &AssetKey,
        source_url: Option<&str>,
        hint: &str,
    ) -> Option<PathBuf> {
        let Some(url) = source_url.filter(|url| !url.is_empty()) else {
            return cached_path(state, key);
        };
        if let Some(path) = cached_path(state, key) {
            debug!("asset {key} cached at {}", path.display());
            return Some(path);
        }

        let bytes = self.fetch(key, url)?;
        self.store(state, key, url, hint, &bytes)
            .or_else(|| cached_path(state, key))
    }

    fn fetch(&self, key: &AssetKey, url: &str) -> Option<Vec<u8>> {
        let label = format!("download {key}");
        match self.retry.execute(&label, || self.api.download(url)) {
            Ok(download) if download.is_success() => Some(download.bytes),
            Ok(download) => {
                warn!("asset {key}: download returned HTTP {}", download.status);
                None
            }
            Err(e) => {
                warn!("asset {key}: {e}");
                None
            }
        }
    }

    fn store(
        &self,
        state: &mut SyncState,
        key: &AssetKey,
        url: &str,
        hint: &str,
        bytes: &[u8],
    ) -> Option<PathBuf> {
        let hash = content_hash(bytes);
        let path = self.dir.join(asset_file_name(hint, &hash, url));

        if path.exists() {
            debug!("asset {key} deduplicated to {}", path.display());
        } else if let Err(e) = write_bytes(&path, bytes) {
            warn!("asset {key}: {e}");
            return None;
        }

        state.assets.insert(
            key.as_str().to_owned(),
            AssetRecord {
                local_path: path.clone(),
                content_hash: hash,
                size_bytes: bytes.len() as u64,
                last_updated: Utc::now(),
                last_source_url: url.to_owned(),
            },
        );
        Some(path)
    }
}

/// Recorded path for `key`, if the file is still on disk.
fn cached_path(state: &SyncState, key: &AssetKey) -> Option<PathBuf> {
    state
        .assets
        .get(key.as_str())
        .map(|record| record.local_path.clone())
        .filter(|path| path.exists())
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn asset_file_name(hint: &str, hash: &str, url: &str) -> String {
    let prefix = hash.get(..HASH_PREFIX_LEN).unwrap_or(hash);
    format!("{}-{prefix}.{}", file_stem(hint), infer_extension(url))
}

/// Extension of the URL's last path segment, ignoring query and fragment.
///
/// Falls back to [`DEFAULT_EXTENSION`] unless the segment ends in 1 to 5
/// alphanumeric characters after a dot.
pub fn infer_extension(source_url: &str) -> String {
    Url::parse(source_url)
        .ok()
        .and_then(|url| {
            let segment = url.path_segments()?.next_back()?.to_owned();
            let (_, ext) = segment.rsplit_once('.')?;
            Some(ext.to_ascii_lowercase())
        })
        .filter(|ext| {
            (1..=MAX_EXTENSION_LEN).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_owned())
}
