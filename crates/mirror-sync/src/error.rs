//! Error types for the sync engine.

use std::path::PathBuf;

use mirror_notion::NotionError;

/// Error from a sync operation.
///
/// Asset download problems never show up here: they degrade to a missing
/// local path instead of failing the sync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A remote call kept failing until the retry budget ran out.
    #[error("{label} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        /// What was being attempted (e.g. "list children of <id>").
        label: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last failure.
        #[source]
        source: NotionError,
    },

    /// Filesystem error.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with something we cannot work with.
    #[error("unexpected response for {id}: {message}")]
    InvalidResponse {
        /// Resource the response belongs to.
        id: String,
        /// What was wrong with it.
        message: String,
    },

    /// Two targets would be written to the same snapshot file.
    #[error("more than one target writes to {}", path.display())]
    DuplicateOutput {
        /// Snapshot file claimed twice.
        path: PathBuf,
    },

    /// The block tree is nested deeper than any real page should be.
    #[error("block tree under {root} exceeds {limit} levels")]
    TreeTooDeep {
        /// Resource whose tree was being fetched.
        root: String,
        /// Depth limit that was hit.
        limit: usize,
    },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(id: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            id: id.to_owned(),
            message: message.into(),
        }
    }
}
