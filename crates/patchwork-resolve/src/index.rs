#![forbid(unsafe_code)]

use std::{
    collections::HashMap,
    fs::File,
    path::{Path, PathBuf},
};

use patchwork_archive::PackageArchive;
use tracing::{debug, warn};

use crate::ResolveResult;

/// Entry name → owning archive, built from one scan over the host package
/// and its split archives.
///
/// The first archive scanned wins when names collide. All archive handles
/// are held for the lifetime of the index and released when it is dropped.
pub struct ResourceIndex {
    archives: Vec<PackageArchive<File>>,
    entries: HashMap<String, (usize, usize)>,
}

impl ResourceIndex {
    /// Scan `primary` and then every split archive, in order.
    ///
    /// The primary package must open. A split archive that cannot be read
    /// is logged and left out of the index.
    pub fn scan(primary: &Path, splits: &[PathBuf]) -> ResolveResult<Self> {
        let mut index = Self {
            archives: Vec::with_capacity(1 + splits.len()),
            entries: HashMap::new(),
        };
        index.add(PackageArchive::open(primary)?)?;
        for split in splits {
            match PackageArchive::open(split) {
                Ok(archive) => index.add(archive)?,
                Err(e) => warn!(archive = %split.display(), error = %e, "split archive skipped"),
            }
        }
        debug!(
            archives = index.archives.len(),
            entries = index.entries.len(),
            "resource index built"
        );
        Ok(index)
    }

    fn add(&mut self, mut archive: PackageArchive<File>) -> ResolveResult<()> {
        let slot = self.archives.len();
        for (entry, name) in archive.entry_names()?.into_iter().enumerate() {
            if name.ends_with('/') {
                continue;
            }
            self.entries.entry(name).or_insert((slot, entry));
        }
        self.archives.push(archive);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Label of the archive that owns `name`.
    #[must_use]
    pub fn owner(&self, name: &str) -> Option<&str> {
        let &(slot, _) = self.entries.get(name)?;
        self.archives.get(slot).map(PackageArchive::label)
    }

    /// Stream entry `name` to `dest`. `Ok(None)` when the index has no such entry.
    pub fn extract(&mut self, name: &str, dest: &Path) -> ResolveResult<Option<u64>> {
        let Some(&(slot, entry)) = self.entries.get(name) else {
            return Ok(None);
        };
        let Some(archive) = self.archives.get_mut(slot) else {
            return Ok(None);
        };
        Ok(Some(archive.extract_index_to_file(entry, dest)?))
    }
}
