//! Snapshot files on disk.
//!
//! Every JSON document the engine produces (page snapshots, database
//! snapshots, the state file) and every asset is written through a temporary
//! file in the destination directory and renamed into place, so readers never
//! observe a half-written file.
//!
//! Layout under the snapshot root:
//! ```text
//! {root}/
//! +-- pages/
//! |   +-- about.json        # page snapshot, named by alias or id
//! +-- databases/
//!     +-- posts.json        # { "results": [...] }
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::SyncError;

/// Where snapshot files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    root: PathBuf,
}

impl SnapshotLayout {
    /// Create a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Snapshot root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot file for a standalone page.
    #[must_use]
    pub fn page_path(&self, alias_or_id: &str) -> PathBuf {
        self.root
            .join("pages")
            .join(format!("{}.json", file_stem(alias_or_id)))
    }

    /// Snapshot file for a database.
    #[must_use]
    pub fn database_path(&self, name: &str) -> PathBuf {
        self.root
            .join("databases")
            .join(format!("{}.json", file_stem(name)))
    }
}

/// Reduce a name to characters that are safe in a file name.
pub(crate) fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "untitled".to_owned()
    } else {
        stem.to_owned()
    }
}

/// Read and parse a JSON file. A missing file is `Ok(None)`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SyncError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SyncError::io(path, e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_bytes(path, &bytes)
}

/// Atomically replace `path` with `bytes`, creating parent directories.
pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SyncError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| SyncError::io(path, e))?;
    tmp.persist(path).map_err(|e| SyncError::io(path, e.error))?;
    Ok(())
}
