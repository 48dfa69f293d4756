#![forbid(unsafe_code)]

use patchwork_storage::StorageError;
use thiserror::Error;

pub type VersionsResult<T> = Result<T, VersionsError>;

#[derive(Debug, Error)]
pub enum VersionsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bundle version {hash} not found")]
    VersionNotFound { hash: String },

    #[error("invalid name {0:?}: must be a single path segment")]
    InvalidName(String),
}
