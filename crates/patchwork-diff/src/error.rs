#![forbid(unsafe_code)]

use thiserror::Error;

pub type DiffResult<T> = Result<T, DiffError>;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("malformed diff manifest: {0}")]
    ManifestFormat(String),

    #[error("manifest path escapes output root: {path}")]
    PathTraversal { path: String },

    #[error("corrupt patch: {0}")]
    CorruptPatch(String),
}

impl DiffError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptPatch(reason.into())
    }
}

impl From<serde_json::Error> for DiffError {
    fn from(e: serde_json::Error) -> Self {
        Self::ManifestFormat(e.to_string())
    }
}
