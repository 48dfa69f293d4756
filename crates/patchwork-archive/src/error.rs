#![forbid(unsafe_code)]

use patchwork_storage::StorageError;
use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An entry would be written outside of the destination root.
    #[error("archive entry escapes destination: {entry}")]
    PathTraversal { entry: String },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl ArchiveError {
    #[must_use]
    pub fn is_path_traversal(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }

    pub(crate) fn from_storage(entry: &str, e: StorageError) -> Self {
        match e {
            StorageError::PathTraversal { .. } => Self::PathTraversal {
                entry: entry.to_string(),
            },
            StorageError::Io(io) => Self::Io(io),
            other => Self::Storage(other),
        }
    }
}
