#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used by `patchwork-storage`.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by storage primitives.
///
/// Higher-level crates wrap this error to add domain context (entry name, hash).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A relative path resolves outside of its root.
    #[error("path escapes root: {path}")]
    PathTraversal { path: String },

    /// A name that must be a single path segment is not.
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    #[error("storage failed: {0}")]
    Failed(String),
}

impl StorageError {
    pub(crate) fn traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    #[must_use]
    pub fn is_path_traversal(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }
}
