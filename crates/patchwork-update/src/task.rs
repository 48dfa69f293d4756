#![forbid(unsafe_code)]

use std::{path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use patchwork_resolve::ResolveReport;
use patchwork_versions::{RetentionReport, RetentionState};
use tokio::sync::oneshot;
use url::Url;

use crate::{UpdateError, UpdateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    FullPackage,
    DiffFromHostPackage,
    DiffFromPreviousPackage,
    PlainDownload,
    Retention,
}

impl TaskKind {
    /// Stable label used in events and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FullPackage => "full",
            Self::DiffFromHostPackage => "diff-from-package",
            Self::DiffFromPreviousPackage => "diff-from-ppk",
            Self::PlainDownload => "download",
            Self::Retention => "retention",
        }
    }

    /// Whether the task materializes a version directory.
    #[must_use]
    pub fn produces_version(self) -> bool {
        matches!(
            self,
            Self::FullPackage | Self::DiffFromHostPackage | Self::DiffFromPreviousPackage
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Downloading,
    Applying,
    Succeeded,
    Failed,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One update request. Immutable once started.
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub kind: TaskKind,
    /// Content hash of the produced version (or the file for plain downloads).
    pub hash: String,
    pub url: Option<Url>,
    pub staging: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub baseline_dir: Option<PathBuf>,
    pub baseline_hash: Option<String>,
    /// Names retention must keep, in addition to in-flight ones.
    pub pinned: RetentionState,
}

impl UpdateTask {
    fn new(kind: TaskKind, hash: &str) -> Self {
        Self {
            kind,
            hash: hash.to_string(),
            url: None,
            staging: None,
            output_dir: None,
            baseline_dir: None,
            baseline_hash: None,
            pinned: RetentionState::new(),
        }
    }

    #[must_use]
    pub fn full(url: Url, hash: &str, staging: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            url: Some(url),
            staging: Some(staging),
            output_dir: Some(output_dir),
            ..Self::new(TaskKind::FullPackage, hash)
        }
    }

    #[must_use]
    pub fn diff_from_host(url: Url, hash: &str, staging: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            url: Some(url),
            staging: Some(staging),
            output_dir: Some(output_dir),
            ..Self::new(TaskKind::DiffFromHostPackage, hash)
        }
    }

    #[must_use]
    pub fn diff_from_previous(
        url: Url,
        hash: &str,
        staging: PathBuf,
        output_dir: PathBuf,
        baseline_hash: &str,
        baseline_dir: PathBuf,
    ) -> Self {
        Self {
            url: Some(url),
            staging: Some(staging),
            output_dir: Some(output_dir),
            baseline_dir: Some(baseline_dir),
            baseline_hash: Some(baseline_hash.to_string()),
            ..Self::new(TaskKind::DiffFromPreviousPackage, hash)
        }
    }

    #[must_use]
    pub fn plain(url: Url, hash: &str, target: PathBuf) -> Self {
        Self {
            url: Some(url),
            staging: Some(target),
            ..Self::new(TaskKind::PlainDownload, hash)
        }
    }

    #[must_use]
    pub fn retention(pinned: RetentionState) -> Self {
        Self {
            pinned,
            ..Self::new(TaskKind::Retention, "")
        }
    }
}

/// Successful result of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A version directory was fully materialized.
    Installed {
        hash: String,
        dir: PathBuf,
        /// Resource reconciliation details for diff tasks.
        resources: Option<ResolveReport>,
    },
    /// A plain file was downloaded and handed to the host installer.
    Downloaded { path: PathBuf },
    Pruned(RetentionReport),
}

/// Completion handle of a spawned task.
///
/// The task runs to completion whether or not the handle is awaited.
pub struct TaskHandle {
    kind: TaskKind,
    hash: String,
    state: Arc<Mutex<TaskState>>,
    rx: oneshot::Receiver<UpdateResult<TaskOutcome>>,
}

impl TaskHandle {
    pub(crate) fn new(
        kind: TaskKind,
        hash: String,
        state: Arc<Mutex<TaskState>>,
        rx: oneshot::Receiver<UpdateResult<TaskOutcome>>,
    ) -> Self {
        Self {
            kind,
            hash,
            state,
            rx,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Current state of the task.
    #[must_use]
    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    /// Wait for the task's single completion.
    pub async fn wait(self) -> UpdateResult<TaskOutcome> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(UpdateError::Aborted("task dropped its completion".into())))
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("kind", &self.kind)
            .field("hash", &self.hash)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
