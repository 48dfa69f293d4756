#![forbid(unsafe_code)]

//! Blocking `Applying` stage of each package task type.

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use patchwork_archive::PackageArchive;
use patchwork_diff::{
    BUNDLE_PATCH_ENTRY, BinaryPatcher, DiffManifest, MANIFEST_ENTRY, is_reserved_entry,
};
use patchwork_resolve::{ResolveReport, ResourceIndex, resolve_from_host, resolve_from_previous};
use patchwork_storage::{prepare_target, remove_tree, write_atomic};
use tracing::{debug, info};

use crate::{HostRuntime, UpdateError, UpdateResult};

/// Contents of a diff package that were validated before anything is written.
struct DiffPackage {
    archive: PackageArchive<fs::File>,
    manifest: DiffManifest,
    bundle_patch: Vec<u8>,
}

impl DiffPackage {
    fn open(staging: &Path) -> UpdateResult<Self> {
        let mut archive = PackageArchive::open(staging)?;
        let manifest = archive
            .read_entry(MANIFEST_ENTRY)?
            .ok_or(UpdateError::IncompletePackage {
                missing: MANIFEST_ENTRY,
            })?;
        let bundle_patch = archive
            .read_entry(BUNDLE_PATCH_ENTRY)?
            .ok_or(UpdateError::IncompletePackage {
                missing: BUNDLE_PATCH_ENTRY,
            })?;
        let manifest = DiffManifest::parse(&manifest)?;
        Ok(Self {
            archive,
            manifest,
            bundle_patch,
        })
    }

    /// Extract literal entries into `out_dir` and write the patched bundle.
    ///
    /// Returns every destination already satisfied.
    fn materialize(
        &mut self,
        out_dir: &Path,
        bundle_file: &str,
        baseline: &[u8],
        patcher: &dyn BinaryPatcher,
    ) -> UpdateResult<HashSet<String>> {
        let report = self.archive.extract_all(out_dir, is_reserved_entry)?;
        let patched = patcher.apply(baseline, &self.bundle_patch)?;
        let bundle = prepare_target(out_dir, bundle_file)?;
        write_atomic(&bundle, &patched)?;
        debug!(
            literal = report.files.len(),
            bundle_bytes = patched.len(),
            "diff package materialized"
        );

        let mut satisfied: HashSet<String> = report.files.into_iter().collect();
        satisfied.insert(bundle_file.to_string());
        Ok(satisfied)
    }
}

fn fresh_dir(dir: &Path) -> UpdateResult<()> {
    remove_tree(dir)?;
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Unpack a full package: the output holds exactly the archive's entries.
pub(crate) fn full_package(staging: &Path, out_dir: &Path) -> UpdateResult<()> {
    let mut archive = PackageArchive::open(staging)?;
    fresh_dir(out_dir)?;
    let report = archive.extract_all(out_dir, |_| false)?;
    info!(dir = %out_dir.display(), files = report.files.len(), "full package installed");
    Ok(())
}

/// Apply a diff against the host package and its split archives.
pub(crate) fn diff_from_host(
    staging: &Path,
    out_dir: &Path,
    bundle_file: &str,
    host: &dyn HostRuntime,
    patcher: &dyn BinaryPatcher,
) -> UpdateResult<ResolveReport> {
    let mut package = DiffPackage::open(staging)?;
    let baseline = host
        .origin_bundle()
        .map_err(|e| UpdateError::Host(format!("origin bundle: {e}")))?;
    fresh_dir(out_dir)?;
    let satisfied = package.materialize(out_dir, bundle_file, &baseline, patcher)?;

    let mut index = ResourceIndex::scan(&host.package_path(), &host.split_archive_paths())?;
    let report = resolve_from_host(&package.manifest, &mut index, out_dir, &satisfied)?;
    info!(
        dir = %out_dir.display(),
        baseline_bytes = baseline.len(),
        copied = report.materialized.len(),
        skipped = report.skipped.len(),
        "host-package diff installed"
    );
    Ok(report)
}

/// Apply a diff against a previously installed version directory.
pub(crate) fn diff_from_previous(
    staging: &Path,
    out_dir: &Path,
    baseline_dir: &Path,
    baseline_hash: &str,
    bundle_file: &str,
    patcher: &dyn BinaryPatcher,
) -> UpdateResult<ResolveReport> {
    let mut package = DiffPackage::open(staging)?;
    let baseline = read_baseline_bundle(baseline_dir, baseline_hash, bundle_file)?;
    fresh_dir(out_dir)?;
    let satisfied = package.materialize(out_dir, bundle_file, &baseline, patcher)?;

    let report = resolve_from_previous(&package.manifest, baseline_dir, out_dir, &satisfied)?;
    info!(
        dir = %out_dir.display(),
        origin = baseline_hash,
        copied = report.materialized.len(),
        tree_copied = report.tree_copied,
        "previous-package diff installed"
    );
    Ok(report)
}

fn read_baseline_bundle(dir: &Path, hash: &str, bundle_file: &str) -> UpdateResult<Vec<u8>> {
    let path: PathBuf = dir.join(bundle_file);
    fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => UpdateError::VersionNotFound {
            hash: hash.to_string(),
        },
        _ => e.into(),
    })
}
