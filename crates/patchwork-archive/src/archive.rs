#![forbid(unsafe_code)]

use std::{
    fs::{self, File},
    io::{self, Read, Seek},
    path::Path,
};

use patchwork_storage::{prepare_target, sanitize_rel};
use tracing::{debug, trace};
use zip::{ZipArchive, read::ZipFile, result::ZipError};

use crate::{ArchiveError, ArchiveResult};

/// Files and directories written by [`PackageArchive::extract_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    /// Normalized relative names of extracted files, in archive order.
    pub files: Vec<String>,
    /// Entries the caller asked to leave in the archive.
    pub skipped: Vec<String>,
    pub bytes: u64,
}

/// A zip archive opened for reading.
pub struct PackageArchive<R> {
    inner: ZipArchive<R>,
    label: String,
}

impl PackageArchive<File> {
    /// Open the archive at `path`.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, path.display().to_string())
    }
}

impl<R: Read + Seek> PackageArchive<R> {
    pub fn from_reader(reader: R, label: impl Into<String>) -> ArchiveResult<Self> {
        Ok(Self {
            inner: ZipArchive::new(reader)?,
            label: label.into(),
        })
    }

    /// Human-readable origin of this archive (usually its path).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Raw entry names in central-directory order, directories included.
    pub fn entry_names(&mut self) -> ArchiveResult<Vec<String>> {
        (0..self.inner.len())
            .map(|i| Ok(self.inner.by_index(i)?.name().to_string()))
            .collect()
    }

    /// Read a whole entry into memory. `Ok(None)` when the entry is absent.
    pub fn read_entry(&mut self, name: &str) -> ArchiveResult<Option<Vec<u8>>> {
        let mut entry = match self.inner.by_name(name) {
            Ok(e) => e,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    /// Stream entry `index` to exactly `dest`, replacing any existing file.
    ///
    /// The caller owns containment of `dest`.
    pub fn extract_index_to_file(&mut self, index: usize, dest: &Path) -> ArchiveResult<u64> {
        let entry = self.inner.by_index(index)?;
        copy_entry(entry, dest, &self.label)
    }

    /// Stream the entry `name` to exactly `dest`. `Ok(None)` when absent.
    pub fn extract_entry_to_file(&mut self, name: &str, dest: &Path) -> ArchiveResult<Option<u64>> {
        match self.inner.by_name(name) {
            Ok(entry) => copy_entry(entry, dest, &self.label).map(Some),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Extract every entry under `dest`, except those for which `skip`
    /// returns `true`.
    ///
    /// All entry names are validated before anything is written; any name
    /// that could leave `dest` fails the whole extraction with
    /// [`ArchiveError::PathTraversal`]. Each write target is re-checked
    /// against the canonical root, so escapes via symlinked directories are
    /// rejected too.
    pub fn extract_all<F>(&mut self, dest: &Path, skip: F) -> ArchiveResult<ExtractReport>
    where
        F: Fn(&str) -> bool,
    {
        fs::create_dir_all(dest)?;
        let plan = self.plan(dest)?;

        let mut report = ExtractReport::default();
        for (index, rel, is_dir) in plan {
            if skip(&rel) {
                debug!(archive = %self.label, entry = %rel, "entry left in archive");
                report.skipped.push(rel);
                continue;
            }
            let target =
                prepare_target(dest, &rel).map_err(|e| ArchiveError::from_storage(&rel, e))?;
            if is_dir {
                fs::create_dir_all(&target)?;
                continue;
            }
            report.bytes += self.extract_index_to_file(index, &target)?;
            report.files.push(rel);
        }
        debug!(
            archive = %self.label,
            dest = %dest.display(),
            files = report.files.len(),
            bytes = report.bytes,
            "archive extracted"
        );
        Ok(report)
    }

    /// Validate every entry name and return `(index, normalized name, is_dir)`.
    fn plan(&mut self, dest: &Path) -> ArchiveResult<Vec<(usize, String, bool)>> {
        let mut plan = Vec::with_capacity(self.inner.len());
        for index in 0..self.inner.len() {
            let entry = self.inner.by_index_raw(index)?;
            let raw = entry.name().to_string();
            // `enclosed_name` also rejects NUL bytes and drive prefixes.
            let rel = match (entry.enclosed_name(), sanitize_rel(&raw)) {
                (Some(_), Ok(rel)) => rel,
                _ => {
                    debug!(archive = %self.label, dest = %dest.display(), entry = %raw, "rejecting entry");
                    return Err(ArchiveError::PathTraversal { entry: raw });
                }
            };
            plan.push((index, rel, entry.is_dir()));
        }
        Ok(plan)
    }
}

fn copy_entry(mut entry: ZipFile<'_>, dest: &Path, label: &str) -> ArchiveResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(dest)?;
    let written = io::copy(&mut entry, &mut out)?;
    trace!(archive = %label, entry = entry.name(), bytes = written, "entry extracted");
    Ok(written)
}
