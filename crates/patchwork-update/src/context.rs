#![forbid(unsafe_code)]

use std::{path::PathBuf, sync::Arc};

use patchwork_diff::BinaryPatcher;
use patchwork_events::{Event, EventBus};
use patchwork_net::{HttpClient, Net, NetExt};
use patchwork_versions::{RetentionState, VersionRoot, VersionState, VersionStore};
use tokio::sync::broadcast;
use tracing::info;
use url::Url;

use crate::{
    Downloader, HostRuntime, Orchestrator, TaskHandle, TaskKind, UpdateConfig, UpdateResult,
    UpdateTask,
};

/// Update engine bound to one version root.
///
/// Owns the persisted version state and schedules every task through a
/// single [`Orchestrator`]. Must be constructed inside a Tokio runtime.
pub struct UpdateContext {
    root: VersionRoot,
    store: Arc<VersionStore>,
    orchestrator: Orchestrator,
}

impl UpdateContext {
    /// Build a context with the reqwest-backed client from `config.net`, its
    /// response phase bounded by `config.net.request_timeout`.
    pub fn new(
        config: UpdateConfig,
        host: Arc<dyn HostRuntime>,
        patcher: Arc<dyn BinaryPatcher>,
    ) -> UpdateResult<Self> {
        let net = HttpClient::new(config.net.clone())?.with_timeout(config.net.request_timeout);
        Self::with_net(config, Arc::new(net), host, patcher)
    }

    pub fn with_net(
        config: UpdateConfig,
        net: Arc<dyn Net>,
        host: Arc<dyn HostRuntime>,
        patcher: Arc<dyn BinaryPatcher>,
    ) -> UpdateResult<Self> {
        let root = VersionRoot::new(config.root_dir.clone());
        root.ensure()?;

        let bus = config
            .bus
            .clone()
            .unwrap_or_else(|| EventBus::new(config.event_channel_capacity));
        let downloader = Downloader::new(net, bus.clone())
            .with_headers(config.headers.clone())
            .with_buffer(config.chunk_size);

        let store = Arc::new(VersionStore::open(root.clone(), config.bundle_file.clone()));
        let package_version = host.package_version();
        let reset = store.sync_package_version(&package_version)?;

        let orchestrator = Orchestrator::new(
            root.path().to_path_buf(),
            config.bundle_file,
            config.retention,
            downloader,
            host,
            patcher,
            bus,
        );
        info!(root = %root.path().display(), package_version = %package_version, "update context ready");

        let context = Self {
            root,
            store,
            orchestrator,
        };
        if reset {
            // Versions built against the previous host package are unpinned.
            drop(context.orchestrator.spawn(UpdateTask::retention(RetentionState::new())));
        }
        Ok(context)
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        self.orchestrator.bus()
    }

    /// Subscribe to download progress and task lifecycle events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus().subscribe()
    }

    #[must_use]
    pub fn root(&self) -> &VersionRoot {
        &self.root
    }

    #[must_use]
    pub fn state(&self) -> VersionState {
        self.store.snapshot()
    }

    /// Download a complete package and extract it as version `hash`.
    pub fn download_full_update(&self, url: Url, hash: &str) -> TaskHandle {
        let paths = self
            .root
            .full_staging(hash)
            .and_then(|staging| Ok((staging, self.root.version_dir(hash)?)));
        match paths {
            Ok((staging, out)) => self
                .orchestrator
                .spawn(UpdateTask::full(url, hash, staging, out)),
            Err(e) => self.orchestrator.reject(TaskKind::FullPackage, hash, e.into()),
        }
    }

    /// Download a diff against the host package and materialize version `hash`.
    pub fn download_patch_from_package(&self, url: Url, hash: &str) -> TaskHandle {
        let paths = self
            .root
            .host_patch_staging(hash)
            .and_then(|staging| Ok((staging, self.root.version_dir(hash)?)));
        match paths {
            Ok((staging, out)) => self
                .orchestrator
                .spawn(UpdateTask::diff_from_host(url, hash, staging, out)),
            Err(e) => self
                .orchestrator
                .reject(TaskKind::DiffFromHostPackage, hash, e.into()),
        }
    }

    /// Download a diff against version `origin_hash` and materialize version `hash`.
    pub fn download_patch_from_ppk(&self, url: Url, hash: &str, origin_hash: &str) -> TaskHandle {
        let paths = self.root.ppk_patch_staging(origin_hash, hash).and_then(|staging| {
            Ok((
                staging,
                self.root.version_dir(hash)?,
                self.root.version_dir(origin_hash)?,
            ))
        });
        match paths {
            Ok((staging, out, baseline)) => self.orchestrator.spawn(UpdateTask::diff_from_previous(
                url,
                hash,
                staging,
                out,
                origin_hash,
                baseline,
            )),
            Err(e) => self
                .orchestrator
                .reject(TaskKind::DiffFromPreviousPackage, hash, e.into()),
        }
    }

    /// Download `url` to `<root>/<file_name>` and hand it to the host installer.
    pub fn download_file(&self, url: Url, hash: &str, file_name: &str) -> TaskHandle {
        match self.root.plain_file(file_name) {
            Ok(target) => self.orchestrator.spawn(UpdateTask::plain(url, hash, target)),
            Err(e) => self.orchestrator.reject(TaskKind::PlainDownload, hash, e.into()),
        }
    }

    /// Schedule a retention pass keeping the current and last versions.
    pub fn clean_up(&self) -> TaskHandle {
        self.orchestrator
            .spawn(UpdateTask::retention(self.store.retention_state()))
    }

    /// Make `hash` the version loaded on the next launch.
    pub fn switch_version(&self, hash: &str) -> UpdateResult<()> {
        Ok(self.store.switch_version(hash)?)
    }

    /// Confirm the current version and prune what it superseded.
    pub fn mark_success(&self) -> UpdateResult<TaskHandle> {
        self.store.mark_success()?;
        Ok(self.clean_up())
    }

    pub fn clear_first_time(&self) -> UpdateResult<TaskHandle> {
        self.store.clear_first_time()?;
        Ok(self.clean_up())
    }

    pub fn clear_rollback_mark(&self) -> UpdateResult<TaskHandle> {
        self.store.clear_rollback_mark()?;
        Ok(self.clean_up())
    }

    /// Abandon the current version. Returns the version now current.
    pub fn rollback(&self) -> UpdateResult<Option<String>> {
        Ok(self.store.rollback()?)
    }

    /// Bundle to load at launch; `None` means the host package's own bundle.
    pub fn resolve_bundle(&self) -> UpdateResult<Option<PathBuf>> {
        Ok(self.store.resolve_bundle()?)
    }
}

impl std::fmt::Debug for UpdateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("root", &self.root.path())
            .finish_non_exhaustive()
    }
}
