#![forbid(unsafe_code)]

use patchwork_archive::ArchiveError;
use patchwork_diff::DiffError;
use patchwork_net::NetError;
use patchwork_resolve::ResolveError;
use patchwork_storage::StorageError;
use patchwork_versions::VersionsError;
use thiserror::Error;

pub type UpdateResult<T> = Result<T, UpdateError>;

/// Task-level failure, surfaced once through the task's completion.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Bad status or connection failure.
    #[error("network error: {0}")]
    Network(#[from] NetError),

    #[error("truncated transfer: received {received} of {expected} bytes")]
    TruncatedTransfer { received: u64, expected: u64 },

    /// A write would have left the version root.
    #[error("path traversal rejected: {path}")]
    PathTraversal { path: String },

    #[error("malformed diff manifest: {0}")]
    ManifestFormat(String),

    #[error("incomplete patch package: {missing} not found")]
    IncompletePackage { missing: &'static str },

    #[error("corrupt patch: {0}")]
    CorruptPatch(String),

    /// The downloaded artifact is not a readable archive.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    #[error("bundle version {hash} not found")]
    VersionNotFound { hash: String },

    #[error("invalid name {0:?}")]
    InvalidName(String),

    /// Another task is already producing or downloading this name.
    #[error("task conflict: {name} is already in flight")]
    TaskConflict { name: String },

    /// Host runtime adapter failure.
    #[error("host runtime error: {0}")]
    Host(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task aborted: {0}")]
    Aborted(String),
}

impl UpdateError {
    /// Security-relevant failures. Never retry these.
    #[must_use]
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }
}

impl From<StorageError> for UpdateError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PathTraversal { path } => Self::PathTraversal { path },
            StorageError::InvalidSegment(name) => Self::InvalidName(name),
            StorageError::Io(io) => Self::Io(io),
            StorageError::Failed(msg) => Self::Io(std::io::Error::other(msg)),
        }
    }
}

impl From<ArchiveError> for UpdateError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::PathTraversal { entry } => Self::PathTraversal { path: entry },
            ArchiveError::Io(io) => Self::Io(io),
            ArchiveError::Zip(zip) => Self::InvalidPackage(zip.to_string()),
            ArchiveError::Storage(s) => s.into(),
        }
    }
}

impl From<DiffError> for UpdateError {
    fn from(e: DiffError) -> Self {
        match e {
            DiffError::ManifestFormat(msg) => Self::ManifestFormat(msg),
            DiffError::PathTraversal { path } => Self::PathTraversal { path },
            DiffError::CorruptPatch(msg) => Self::CorruptPatch(msg),
        }
    }
}

impl From<ResolveError> for UpdateError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::PathTraversal { path } => Self::PathTraversal { path },
            ResolveError::Io(io) => Self::Io(io),
            ResolveError::Archive(a) => a.into(),
            ResolveError::Storage(s) => s.into(),
        }
    }
}

impl From<VersionsError> for UpdateError {
    fn from(e: VersionsError) -> Self {
        match e {
            VersionsError::Io(io) => Self::Io(io),
            VersionsError::Storage(s) => s.into(),
            VersionsError::Json(j) => Self::Io(std::io::Error::other(j)),
            VersionsError::VersionNotFound { hash } => Self::VersionNotFound { hash },
            VersionsError::InvalidName(name) => Self::InvalidName(name),
        }
    }
}

impl From<tokio::task::JoinError> for UpdateError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Aborted(e.to_string())
    }
}
