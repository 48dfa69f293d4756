#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use patchwork_storage::validate_segment;

use crate::{VersionsError, VersionsResult};

const STATE_FILE: &str = ".state.json";

/// Path layout of a version root.
///
/// Every name passed in is validated as a single path segment before a
/// path is formed, so no method can address anything outside the root.
#[derive(Debug, Clone)]
pub struct VersionRoot {
    root: PathBuf,
}

impl VersionRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist.
    pub fn ensure(&self) -> VersionsResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `<root>/<hash>/`
    pub fn version_dir(&self, hash: &str) -> VersionsResult<PathBuf> {
        Ok(self.root.join(segment(hash)?))
    }

    /// `<root>/<hash>/<bundle_file>`
    pub fn bundle_path(&self, hash: &str, bundle_file: &str) -> VersionsResult<PathBuf> {
        Ok(self.version_dir(hash)?.join(segment(bundle_file)?))
    }

    /// Staging file of a full package: `<root>/<hash>.ppk`.
    pub fn full_staging(&self, hash: &str) -> VersionsResult<PathBuf> {
        Ok(self.root.join(format!("{}.ppk", segment(hash)?)))
    }

    /// Staging file of a patch against the host package: `<root>/<hash>.apk.patch`.
    pub fn host_patch_staging(&self, hash: &str) -> VersionsResult<PathBuf> {
        Ok(self.root.join(format!("{}.apk.patch", segment(hash)?)))
    }

    /// Staging file of a patch against a previous version:
    /// `<root>/<origin>_<hash>.ppk.patch`.
    pub fn ppk_patch_staging(&self, origin: &str, hash: &str) -> VersionsResult<PathBuf> {
        Ok(self
            .root
            .join(format!("{}_{}.ppk.patch", segment(origin)?, segment(hash)?)))
    }

    /// Plain download target: `<root>/<file_name>`.
    pub fn plain_file(&self, file_name: &str) -> VersionsResult<PathBuf> {
        Ok(self.root.join(segment(file_name)?))
    }

    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }
}

fn segment(name: &str) -> VersionsResult<&str> {
    validate_segment(name).map_err(|_| VersionsError::InvalidName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn layout_names() {
        let root = VersionRoot::new("/data/_update");
        assert_eq!(root.version_dir("h2").unwrap(), Path::new("/data/_update/h2"));
        assert_eq!(root.full_staging("h2").unwrap(), Path::new("/data/_update/h2.ppk"));
        assert_eq!(
            root.host_patch_staging("h2").unwrap(),
            Path::new("/data/_update/h2.apk.patch")
        );
        assert_eq!(
            root.ppk_patch_staging("h1", "h2").unwrap(),
            Path::new("/data/_update/h1_h2.ppk.patch")
        );
        assert_eq!(
            root.bundle_path("h2", "index.bundlejs").unwrap(),
            Path::new("/data/_update/h2/index.bundlejs")
        );
        assert_eq!(root.state_file(), Path::new("/data/_update/.state.json"));
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("../h")]
    #[case("a/b")]
    fn rejects_non_segments(#[case] hash: &str) {
        let root = VersionRoot::new("/data/_update");
        assert!(matches!(
            root.version_dir(hash),
            Err(VersionsError::InvalidName(_))
        ));
        assert!(root.plain_file(hash).is_err());
        assert!(root.ppk_patch_staging("ok", hash).is_err());
    }
}
