#![forbid(unsafe_code)]

use std::{
    collections::BTreeSet,
    fs,
    path::Path,
    time::{Duration, SystemTime},
};

use patchwork_storage::remove_tree;
use tracing::{debug, info, warn};

use crate::VersionsResult;

/// Entries younger than this are never removed.
const DEFAULT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Names beginning with this marker are reserved and never visited.
const RESERVED_MARKER: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub window: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl RetentionPolicy {
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Names a retention pass must never delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionState {
    pinned: BTreeSet<String>,
}

impl RetentionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin each present, non-empty name.
    pub fn from_hashes<'a>(hashes: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut state = Self::new();
        for hash in hashes.into_iter().flatten() {
            state.pin(hash);
        }
        state
    }

    pub fn pin(&mut self, name: &str) {
        if !name.is_empty() {
            self.pinned.insert(name.to_string());
        }
    }

    #[must_use]
    pub fn with_pinned(mut self, name: &str) -> Self {
        self.pin(name);
        self
    }

    #[must_use]
    pub fn is_pinned(&self, name: &str) -> bool {
        self.pinned.contains(name)
    }

    pub fn pinned(&self) -> impl Iterator<Item = &str> {
        self.pinned.iter().map(String::as_str)
    }
}

/// Outcome of one retention pass, by entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub removed: Vec<String>,
    pub kept: Vec<String>,
    pub failed: Vec<String>,
}

/// Remove every immediate child of `root` that is not hidden, not pinned and
/// not modified within the policy window.
///
/// Only listing `root` itself is fatal. A child whose metadata cannot be read
/// is kept; a child that cannot be removed is recorded as failed and the
/// pass continues.
pub fn prune(
    root: &Path,
    state: &RetentionState,
    policy: &RetentionPolicy,
    now: SystemTime,
) -> VersionsResult<RetentionReport> {
    let mut report = RetentionReport::default();
    let mut entries = Vec::new();
    for entry in fs::read_dir(root)? {
        entries.push(entry?);
    }
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            debug!(path = %entry.path().display(), "retention: non-utf8 name kept");
            continue;
        };
        if name.starts_with(RESERVED_MARKER) {
            continue;
        }
        if state.is_pinned(&name) {
            debug!(entry = %name, "retention: pinned");
            report.kept.push(name);
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!(entry = %name, error = %e, "retention: cannot read mtime, keeping");
                report.kept.push(name);
                continue;
            }
        };
        // A timestamp in the future counts as fresh.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < policy.window {
            debug!(entry = %name, age_secs = age.as_secs(), "retention: within window");
            report.kept.push(name);
            continue;
        }

        match remove_tree(&entry.path()) {
            Ok(()) => {
                debug!(entry = %name, age_secs = age.as_secs(), "retention: removed");
                report.removed.push(name);
            }
            Err(e) => {
                warn!(entry = %name, error = %e, "retention: remove failed");
                report.failed.push(name);
            }
        }
    }

    info!(
        root = %root.display(),
        removed = report.removed.len(),
        kept = report.kept.len(),
        failed = report.failed.len(),
        "retention pass finished"
    );
    Ok(report)
}
