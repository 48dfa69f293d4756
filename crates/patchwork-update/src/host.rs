#![forbid(unsafe_code)]

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;
use patchwork_archive::PackageArchive;
use tracing::{debug, info};

/// Bundle entry of an Android host package.
pub const DEFAULT_BUNDLE_ENTRY: &str = "assets/index.android.bundle";

/// Host platform collaborator.
///
/// Everything the engine needs from the application that embeds it: the
/// baseline it was shipped with and a way to hand off installable packages.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait HostRuntime: Send + Sync {
    /// Bundle embedded in the host package. Empty when there is none.
    fn origin_bundle(&self) -> io::Result<Vec<u8>>;

    /// Primary host package archive.
    fn package_path(&self) -> PathBuf;

    /// Additional baseline archives beyond the primary package.
    fn split_archive_paths(&self) -> Vec<PathBuf>;

    /// Version name of the installed host package.
    fn package_version(&self) -> String;

    /// Dispatch a downloaded package to the platform installer.
    fn install_package(&self, path: &Path) -> io::Result<()>;
}

type Installer = Arc<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

/// [`HostRuntime`] for a host package that is itself a zip archive.
#[derive(Clone)]
pub struct PackageHost {
    package: PathBuf,
    splits: Vec<PathBuf>,
    bundle_entry: String,
    version: String,
    installer: Option<Installer>,
}

impl PackageHost {
    pub fn new(package: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            splits: Vec::new(),
            bundle_entry: DEFAULT_BUNDLE_ENTRY.to_string(),
            version: version.into(),
            installer: None,
        }
    }

    #[must_use]
    pub fn with_splits(mut self, splits: Vec<PathBuf>) -> Self {
        self.splits = splits;
        self
    }

    #[must_use]
    pub fn with_bundle_entry(mut self, entry: impl Into<String>) -> Self {
        self.bundle_entry = entry.into();
        self
    }

    /// Platform hook for [`HostRuntime::install_package`].
    ///
    /// Without one, install requests are logged and accepted.
    #[must_use]
    pub fn with_installer<F>(mut self, installer: F) -> Self
    where
        F: Fn(&Path) -> io::Result<()> + Send + Sync + 'static,
    {
        self.installer = Some(Arc::new(installer));
        self
    }
}

impl std::fmt::Debug for PackageHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageHost")
            .field("package", &self.package)
            .field("splits", &self.splits)
            .field("bundle_entry", &self.bundle_entry)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl HostRuntime for PackageHost {
    fn origin_bundle(&self) -> io::Result<Vec<u8>> {
        let mut archive = PackageArchive::open(&self.package).map_err(io::Error::other)?;
        let bundle = archive
            .read_entry(&self.bundle_entry)
            .map_err(io::Error::other)?;
        if bundle.is_none() {
            debug!(entry = %self.bundle_entry, "host package embeds no bundle");
        }
        Ok(bundle.unwrap_or_default())
    }

    fn package_path(&self) -> PathBuf {
        self.package.clone()
    }

    fn split_archive_paths(&self) -> Vec<PathBuf> {
        self.splits.clone()
    }

    fn package_version(&self) -> String {
        self.version.clone()
    }

    fn install_package(&self, path: &Path) -> io::Result<()> {
        match &self.installer {
            Some(install) => install(path),
            None => {
                info!(path = %path.display(), "install requested, no installer configured");
                Ok(())
            }
        }
    }
}
