use std::{path::PathBuf, sync::Arc};

use patchwork::{
    MockHostRuntime, UpdateConfig, UpdateContext, diff::CopyInsertPatcher, net::Net,
};
use patchwork_test_utils::{ZipBuilder, init_tracing};
use rstest::*;
use tempfile::TempDir;

/// Host package version every engine fixture reports.
pub const HOST_VERSION: &str = "1.0.0";

/// Bundle embedded in the host package fixture.
pub const ORIGIN_BUNDLE: &[u8] = b"__d('host bundle v1');";

/// Temp dir holding a host package (`base.apk`), a split archive and a
/// version root (`versions/`).
pub struct Workspace {
    pub dir: TempDir,
    pub package: PathBuf,
    pub split: PathBuf,
}

impl Workspace {
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("versions")
    }

    /// Mocked host runtime backed by the fixture archives.
    pub fn host(&self) -> MockHostRuntime {
        let mut host = MockHostRuntime::new();
        let package = self.package.clone();
        let split = self.split.clone();
        host.expect_origin_bundle()
            .returning(|| Ok(ORIGIN_BUNDLE.to_vec()));
        host.expect_package_path().returning(move || package.clone());
        host.expect_split_archive_paths()
            .returning(move || vec![split.clone()]);
        host.expect_package_version()
            .returning(|| HOST_VERSION.to_string());
        host.expect_install_package().returning(|_| Ok(()));
        host
    }

    pub fn engine(&self) -> UpdateContext {
        UpdateContext::new(
            UpdateConfig::new(self.root()),
            Arc::new(self.host()),
            Arc::new(CopyInsertPatcher::new()),
        )
        .unwrap()
    }

    pub fn engine_with_net(&self, net: Arc<dyn Net>) -> UpdateContext {
        UpdateContext::with_net(
            UpdateConfig::new(self.root()),
            net,
            Arc::new(self.host()),
            Arc::new(CopyInsertPatcher::new()),
        )
        .unwrap()
    }
}

#[fixture]
pub fn workspace() -> Workspace {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("base.apk");
    let split = dir.path().join("split_config.mdpi.apk");
    ZipBuilder::new()
        .file("assets/index.android.bundle", ORIGIN_BUNDLE)
        .file("res/raw/click.ogg", "click")
        .file("res/drawable-hdpi/badge.png", "hdpi badge")
        .write_to(&package);
    ZipBuilder::new()
        .file("res/drawable-mdpi/icon.png", "mdpi icon")
        .write_to(&split);
    Workspace {
        dir,
        package,
        split,
    }
}
