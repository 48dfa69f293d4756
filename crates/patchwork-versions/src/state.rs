#![forbid(unsafe_code)]

use std::path::PathBuf;

use parking_lot::Mutex;
use patchwork_storage::write_atomic;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{RetentionState, VersionRoot, VersionsError, VersionsResult};

/// Persisted activation state of a version root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionState {
    /// Host package version this state was recorded against.
    pub package_version: Option<String>,
    pub current_version: Option<String>,
    /// Version to fall back to while `current_version` is unconfirmed.
    pub last_version: Option<String>,
    /// Set by a switch; consumed by the first launch of the new version.
    pub first_time: bool,
    /// Whether the current version has reported a successful launch.
    pub first_time_ok: bool,
    pub rolled_back_version: Option<String>,
}

impl Default for VersionState {
    fn default() -> Self {
        Self {
            package_version: None,
            current_version: None,
            last_version: None,
            first_time: false,
            first_time_ok: true,
            rolled_back_version: None,
        }
    }
}

/// Thread-safe owner of the [`VersionState`] of one version root.
///
/// Every mutation is persisted before the lock is released, so concurrent
/// callers observe the same order on disk as in memory.
pub struct VersionStore {
    root: VersionRoot,
    bundle_file: String,
    state: Mutex<VersionState>,
}

impl VersionStore {
    /// Load the state file of `root`.
    ///
    /// A missing or unreadable state file yields the default state.
    pub fn open(root: VersionRoot, bundle_file: impl Into<String>) -> Self {
        let path = root.state_file();
        let state = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "version state unreadable, starting fresh");
                VersionState::default()
            }),
            Err(_) => VersionState::default(),
        };
        Self {
            root,
            bundle_file: bundle_file.into(),
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> VersionState {
        self.state.lock().clone()
    }

    #[must_use]
    pub fn root(&self) -> &VersionRoot {
        &self.root
    }

    /// Hashes retention must keep: the current and the last version.
    #[must_use]
    pub fn retention_state(&self) -> RetentionState {
        let state = self.state.lock();
        RetentionState::from_hashes([
            state.current_version.as_deref(),
            state.last_version.as_deref(),
        ])
    }

    /// Record the host package version.
    ///
    /// Returns `true` when a different version was stored before; the state
    /// is then reset, since versions built for the old package no longer apply.
    pub fn sync_package_version(&self, package_version: &str) -> VersionsResult<bool> {
        self.update(|state| match state.package_version.clone() {
            Some(stored) if stored == package_version => false,
            Some(stored) => {
                info!(from = %stored, to = %package_version, "host package changed, resetting versions");
                *state = VersionState {
                    package_version: Some(package_version.to_string()),
                    ..VersionState::default()
                };
                true
            }
            None => {
                state.package_version = Some(package_version.to_string());
                false
            }
        })
    }

    /// Make `hash` the version to load on the next launch.
    pub fn switch_version(&self, hash: &str) -> VersionsResult<()> {
        let bundle = self.root.bundle_path(hash, &self.bundle_file)?;
        if !bundle.is_file() {
            return Err(VersionsError::VersionNotFound {
                hash: hash.to_string(),
            });
        }
        self.update(|state| {
            let previous = state.current_version.replace(hash.to_string());
            if let Some(previous) = previous.filter(|p| p != hash) {
                state.last_version = Some(previous);
            }
            state.first_time = true;
            state.first_time_ok = false;
            state.rolled_back_version = None;
        })?;
        info!(hash, "switched version");
        Ok(())
    }

    /// Confirm that the current version launched successfully.
    pub fn mark_success(&self) -> VersionsResult<()> {
        self.update(|state| {
            state.first_time_ok = true;
            state.first_time = false;
            if state.last_version.is_some() && state.last_version != state.current_version {
                state.last_version = None;
            }
        })
    }

    pub fn clear_first_time(&self) -> VersionsResult<()> {
        self.update(|state| state.first_time = false)
    }

    pub fn clear_rollback_mark(&self) -> VersionsResult<()> {
        self.update(|state| state.rolled_back_version = None)
    }

    /// Abandon the current version for the last one.
    ///
    /// Returns the new current version, `None` when nothing is left.
    pub fn rollback(&self) -> VersionsResult<Option<String>> {
        let current = self.update(rollback_in_place)?;
        info!(current = ?current, "rolled back");
        Ok(current)
    }

    /// Bundle to load at launch, `None` for the host package's own bundle.
    ///
    /// Rolls back when the previous launch of a fresh version never
    /// confirmed success, and keeps rolling back past versions whose bundle
    /// file is missing.
    pub fn resolve_bundle(&self) -> VersionsResult<Option<PathBuf>> {
        let mut state = self.state.lock();
        let before = state.clone();

        if state.current_version.is_some() {
            if state.first_time {
                state.first_time = false;
            } else if !state.first_time_ok {
                warn!(hash = ?state.current_version, "previous launch unconfirmed");
                rollback_in_place(&mut state);
            }
        }

        let mut resolved = None;
        while let Some(hash) = state.current_version.clone() {
            let bundle = self.root.bundle_path(&hash, &self.bundle_file)?;
            if bundle.is_file() {
                resolved = Some(bundle);
                break;
            }
            warn!(hash = %hash, "bundle missing");
            rollback_in_place(&mut state);
        }

        if *state != before {
            self.persist(&state)?;
        }
        debug!(bundle = ?resolved, "bundle resolved");
        Ok(resolved)
    }

    fn update<T>(&self, f: impl FnOnce(&mut VersionState) -> T) -> VersionsResult<T> {
        let mut state = self.state.lock();
        let out = f(&mut state);
        self.persist(&state)?;
        Ok(out)
    }

    fn persist(&self, state: &VersionState) -> VersionsResult<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.root.state_file(), &bytes)?;
        Ok(())
    }
}

fn rollback_in_place(state: &mut VersionState) -> Option<String> {
    let abandoned = state.current_version.take();
    state.current_version = state.last_version.take();
    state.first_time_ok = true;
    state.first_time = false;
    state.rolled_back_version = abandoned;
    state.current_version.clone()
}
