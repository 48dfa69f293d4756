#![forbid(unsafe_code)]

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::StorageResult;

/// Outcome of [`copy_tree_filtered`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub copied: usize,
    /// Files and directories excluded by the filter.
    pub excluded: usize,
    /// Files left alone because the destination already existed.
    pub existing: usize,
}

/// Remove a file, symlink or directory tree.
///
/// Walks with an explicit stack, so depth is bounded by heap, not by the call stack.
/// Missing paths are not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !meta.is_dir() {
        return fs::remove_file(path);
    }

    let mut pending = vec![path.to_path_buf()];
    let mut dirs = Vec::new();
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let entry_path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(entry_path);
            } else {
                fs::remove_file(&entry_path)?;
            }
        }
        dirs.push(dir);
    }
    // Parents were recorded before children.
    for dir in dirs.into_iter().rev() {
        fs::remove_dir(&dir)?;
    }
    Ok(())
}

/// Copy a single file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)
}

/// Copy the tree under `src` into `dst` without overwriting existing files.
///
/// `exclude` receives every entry's key relative to `src`: `dir/name` for
/// files and `dir/name/` for directories. An excluded directory is skipped
/// with its whole subtree. Symlinks are never followed.
pub fn copy_tree_filtered<F>(src: &Path, dst: &Path, exclude: F) -> StorageResult<CopyStats>
where
    F: Fn(&str) -> bool,
{
    let mut stats = CopyStats::default();
    fs::create_dir_all(dst)?;

    let mut pending: Vec<(PathBuf, String)> = vec![(src.to_path_buf(), String::new())];
    while let Some((dir, prefix)) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                debug!(path = %entry.path().display(), "skipping non-utf8 name");
                continue;
            };
            let file_type = entry.file_type()?;
            let rel = format!("{prefix}{name}");

            if file_type.is_dir() {
                let key = format!("{rel}/");
                if exclude(&key) {
                    debug!(entry = %key, "excluded directory");
                    stats.excluded += 1;
                    continue;
                }
                fs::create_dir_all(dst.join(&rel))?;
                pending.push((entry.path(), key));
            } else if file_type.is_file() {
                if exclude(&rel) {
                    debug!(entry = %rel, "excluded file");
                    stats.excluded += 1;
                    continue;
                }
                let target = dst.join(&rel);
                if target.exists() {
                    stats.existing += 1;
                    continue;
                }
                fs::copy(entry.path(), &target)?;
                stats.copied += 1;
            } else {
                debug!(entry = %rel, "skipping symlink");
            }
        }
    }
    Ok(stats)
}
