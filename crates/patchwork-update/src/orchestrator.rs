#![forbid(unsafe_code)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use parking_lot::Mutex;
use patchwork_diff::BinaryPatcher;
use patchwork_events::{EventBus, TaskEvent};
use patchwork_resolve::ResolveReport;
use patchwork_storage::remove_tree;
use patchwork_versions::{RetentionPolicy, prune};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
    Downloader, HostRuntime, TaskHandle, TaskKind, TaskOutcome, TaskState, UpdateError,
    UpdateResult, UpdateTask, apply,
    guard::{InFlight, VersionRootGuard},
};

/// Runs update tasks on background workers and reports each exactly once.
///
/// `Pending → Downloading → Applying → Succeeded | Failed`; retention goes
/// straight from `Pending` to `Applying`.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    bundle_file: String,
    retention: RetentionPolicy,
    downloader: Downloader,
    host: Arc<dyn HostRuntime>,
    patcher: Arc<dyn BinaryPatcher>,
    bus: EventBus,
    guard: Arc<VersionRootGuard>,
}

struct Run {
    task: UpdateTask,
    state: Arc<Mutex<TaskState>>,
    _in_flight: Option<InFlight>,
}

impl Orchestrator {
    pub fn new(
        root: PathBuf,
        bundle_file: String,
        retention: RetentionPolicy,
        downloader: Downloader,
        host: Arc<dyn HostRuntime>,
        patcher: Arc<dyn BinaryPatcher>,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                root,
                bundle_file,
                retention,
                downloader,
                host,
                patcher,
                bus,
                guard: Arc::new(VersionRootGuard::default()),
            }),
        }
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Start `task` on a background worker.
    ///
    /// Must be called from within a Tokio runtime. A task whose output or
    /// staging name is already in flight fails at once with
    /// [`UpdateError::TaskConflict`].
    pub fn spawn(&self, task: UpdateTask) -> TaskHandle {
        let kind = task.kind;
        let hash = task.hash.clone();
        let state = Arc::new(Mutex::new(TaskState::Pending));
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle::new(kind, hash.clone(), Arc::clone(&state), rx);

        self.inner.bus.publish(TaskEvent::Started {
            hash: hash.clone(),
            kind: kind.label(),
        });

        let in_flight = match claimed_names(&task) {
            names if names.is_empty() => None,
            names => match self.inner.guard.register(names, task.baseline_hash.clone()) {
                Ok(claim) => Some(claim),
                Err(e) => {
                    self.inner.finish(&hash, kind, &state, tx, Err(e));
                    return handle;
                }
            },
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let run = Run {
                task,
                state: Arc::clone(&state),
                _in_flight: in_flight,
            };
            let result = inner.execute(&run).await;
            if let Err(e) = &result {
                inner.clean_up_failed(&run.task, e).await;
            }
            // Names are free again before anyone observes the completion.
            drop(run);
            inner.finish(&hash, kind, &state, tx, result);
        });
        handle
    }

    /// Fail a task before it starts, through the same completion path.
    pub fn reject(&self, kind: TaskKind, hash: &str, error: UpdateError) -> TaskHandle {
        let state = Arc::new(Mutex::new(TaskState::Pending));
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle::new(kind, hash.to_string(), Arc::clone(&state), rx);
        self.inner.finish(hash, kind, &state, tx, Err(error));
        handle
    }
}

/// Root-level names a task writes.
fn claimed_names(task: &UpdateTask) -> Vec<String> {
    let file_name = |p: &Option<PathBuf>| {
        p.as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .map(str::to_owned)
    };
    [file_name(&task.output_dir), file_name(&task.staging)]
        .into_iter()
        .flatten()
        .collect()
}

impl Inner {
    fn transition(&self, run: &Run, to: TaskState) {
        let mut state = run.state.lock();
        debug!(
            hash = %run.task.hash,
            kind = run.task.kind.label(),
            from = ?*state,
            to = ?to,
            "task state"
        );
        *state = to;
    }

    async fn execute(&self, run: &Run) -> UpdateResult<TaskOutcome> {
        let task = &run.task;
        match task.kind {
            TaskKind::Retention => {
                let _lease = self.guard.exclusive().await;
                self.transition(run, TaskState::Applying);
                let mut pinned = task.pinned.clone();
                for name in self.guard.in_flight() {
                    pinned.pin(&name);
                }
                let root = self.root.clone();
                let policy = self.retention;
                let report = tokio::task::spawn_blocking(move || {
                    prune(&root, &pinned, &policy, SystemTime::now())
                })
                .await??;
                Ok(TaskOutcome::Pruned(report))
            }
            TaskKind::PlainDownload => {
                let target = required(&task.staging, "staging")?;
                self.download(run).await?;
                self.transition(run, TaskState::Applying);
                let host = Arc::clone(&self.host);
                let path = target.clone();
                tokio::task::spawn_blocking(move || host.install_package(&path))
                    .await?
                    .map_err(|e| UpdateError::Host(format!("install: {e}")))?;
                Ok(TaskOutcome::Downloaded { path: target })
            }
            kind => {
                let _lease = self.guard.shared().await;
                let staging = required(&task.staging, "staging")?;
                let out_dir = required(&task.output_dir, "output_dir")?;
                self.download(run).await?;
                self.transition(run, TaskState::Applying);
                self.bus.publish(TaskEvent::Applying {
                    hash: task.hash.clone(),
                    kind: kind.label(),
                });

                let job = ApplyJob {
                    kind,
                    staging,
                    out_dir: out_dir.clone(),
                    baseline: task.baseline_dir.clone().zip(task.baseline_hash.clone()),
                    bundle_file: self.bundle_file.clone(),
                    host: Arc::clone(&self.host),
                    patcher: Arc::clone(&self.patcher),
                };
                let resources = tokio::task::spawn_blocking(move || job.run()).await??;

                self.remove_quietly(task.staging.as_deref());
                Ok(TaskOutcome::Installed {
                    hash: task.hash.clone(),
                    dir: out_dir,
                    resources,
                })
            }
        }
    }

    async fn download(&self, run: &Run) -> UpdateResult<u64> {
        let task = &run.task;
        let url = task
            .url
            .as_ref()
            .ok_or_else(|| UpdateError::Aborted("task without url".into()))?;
        let staging = required(&task.staging, "staging")?;
        self.transition(run, TaskState::Downloading);
        self.downloader.fetch(url, &staging, &task.hash).await
    }

    /// Remove partial output of a failed task. Failures here are only logged.
    async fn clean_up_failed(&self, task: &UpdateTask, error: &UpdateError) {
        warn!(hash = %task.hash, kind = task.kind.label(), error = %error, "task failed, cleaning up");
        if task.kind == TaskKind::Retention {
            return;
        }
        let mut paths = vec![task.staging.clone()];
        if task.kind.produces_version() {
            paths.push(task.output_dir.clone());
        }
        let removed = tokio::task::spawn_blocking(move || {
            for path in paths.into_iter().flatten() {
                if let Err(e) = remove_tree(&path) {
                    warn!(path = %path.display(), error = %e, "cleanup failed");
                }
            }
        })
        .await;
        if let Err(e) = removed {
            warn!(error = %e, "cleanup worker failed");
        }
    }

    fn remove_quietly(&self, path: Option<&Path>) {
        let Some(path) = path else { return };
        if let Err(e) = remove_tree(path) {
            warn!(path = %path.display(), error = %e, "staging file not removed");
        }
    }

    fn finish(
        &self,
        hash: &str,
        kind: TaskKind,
        state: &Mutex<TaskState>,
        tx: oneshot::Sender<UpdateResult<TaskOutcome>>,
        result: UpdateResult<TaskOutcome>,
    ) {
        let terminal = if result.is_ok() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        };
        *state.lock() = terminal;

        match &result {
            Ok(_) => {
                info!(hash, kind = kind.label(), "task succeeded");
                self.bus.publish(TaskEvent::Succeeded {
                    hash: hash.to_string(),
                    kind: kind.label(),
                });
            }
            Err(e) => {
                warn!(hash, kind = kind.label(), error = %e, security = e.is_security_violation(), "task failed");
                self.bus.publish(TaskEvent::Failed {
                    hash: hash.to_string(),
                    kind: kind.label(),
                    error: e.to_string(),
                });
            }
        }
        if tx.send(result).is_err() {
            debug!(hash, "task handle dropped before completion");
        }
    }
}

/// Inputs of the blocking `Applying` stage of a package task.
struct ApplyJob {
    kind: TaskKind,
    staging: PathBuf,
    out_dir: PathBuf,
    baseline: Option<(PathBuf, String)>,
    bundle_file: String,
    host: Arc<dyn HostRuntime>,
    patcher: Arc<dyn BinaryPatcher>,
}

impl ApplyJob {
    fn run(self) -> UpdateResult<Option<ResolveReport>> {
        match self.kind {
            TaskKind::DiffFromHostPackage => apply::diff_from_host(
                &self.staging,
                &self.out_dir,
                &self.bundle_file,
                self.host.as_ref(),
                self.patcher.as_ref(),
            )
            .map(Some),
            TaskKind::DiffFromPreviousPackage => {
                let (baseline_dir, baseline_hash) = self
                    .baseline
                    .ok_or_else(|| UpdateError::Aborted("diff task without baseline".into()))?;
                apply::diff_from_previous(
                    &self.staging,
                    &self.out_dir,
                    &baseline_dir,
                    &baseline_hash,
                    &self.bundle_file,
                    self.patcher.as_ref(),
                )
                .map(Some)
            }
            _ => apply::full_package(&self.staging, &self.out_dir).map(|()| None),
        }
    }
}

fn required(path: &Option<PathBuf>, what: &str) -> UpdateResult<PathBuf> {
    path.clone()
        .ok_or_else(|| UpdateError::Aborted(format!("task without {what}")))
}
