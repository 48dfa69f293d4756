#![forbid(unsafe_code)]

use patchwork_archive::ArchiveError;
use patchwork_storage::StorageError;
use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("path escapes its root: {path}")]
    PathTraversal { path: String },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ResolveError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PathTraversal { path } => Self::PathTraversal { path },
            StorageError::Io(io) => Self::Io(io),
            other => Self::Storage(other),
        }
    }
}

impl ResolveError {
    /// Whether this error must abort the task rather than skip one resource.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. } | Self::Archive(ArchiveError::PathTraversal { .. })
        )
    }
}
