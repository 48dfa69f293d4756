#![forbid(unsafe_code)]

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use crate::{StorageError, StorageResult};

/// Normalize a relative path to forward slashes and reject anything that could
/// leave its root: empty input, absolute paths, `..` segments, drive prefixes.
///
/// `.` segments are dropped.
pub fn sanitize_rel(input: &str) -> StorageResult<String> {
    let s = input.replace('\\', "/");
    if s.starts_with('/') {
        return Err(StorageError::traversal(input));
    }
    let mut parts = Vec::new();
    for seg in s.split('/') {
        match seg {
            "" | "." => {}
            ".." => return Err(StorageError::traversal(input)),
            seg if seg.contains(':') || seg.contains('\0') => {
                return Err(StorageError::traversal(input));
            }
            seg => parts.push(seg),
        }
    }
    if parts.is_empty() {
        return Err(StorageError::traversal(input));
    }
    Ok(parts.join("/"))
}

/// Lexically join `rel` under `root`, refusing any result outside `root`.
pub fn resolve_within(root: &Path, rel: &str) -> StorageResult<PathBuf> {
    let clean = sanitize_rel(rel)?;
    let mut out = root.to_path_buf();
    for component in Path::new(&clean).components() {
        match component {
            Component::Normal(seg) => out.push(seg),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::traversal(rel));
            }
        }
    }
    Ok(out)
}

/// Resolve `rel` under `root` and create its parent directories, then verify
/// the canonical parent is still a descendant of the canonical root.
///
/// The second check catches escapes a lexical check cannot see, such as a
/// symlinked directory planted inside the root.
pub fn prepare_target(root: &Path, rel: &str) -> StorageResult<PathBuf> {
    let target = resolve_within(root, rel)?;
    let parent = target
        .parent()
        .ok_or_else(|| StorageError::traversal(rel))?;
    fs::create_dir_all(parent)?;

    let canonical_root = fs::canonicalize(root)?;
    let canonical_parent = fs::canonicalize(parent)?;
    if !canonical_parent.starts_with(&canonical_root) {
        return Err(StorageError::traversal(rel));
    }
    let file_name = target
        .file_name()
        .ok_or_else(|| StorageError::traversal(rel))?;
    let resolved = canonical_parent.join(file_name);

    // An existing symlink at the leaf would redirect the write.
    if fs::symlink_metadata(&resolved).is_ok_and(|m| m.file_type().is_symlink()) {
        return Err(StorageError::traversal(rel));
    }
    Ok(resolved)
}

/// Validate a name used as one path segment (content hash, staging file name).
pub fn validate_segment(name: &str) -> StorageResult<&str> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':', '\0']);
    if bad {
        return Err(StorageError::InvalidSegment(name.to_string()));
    }
    Ok(name)
}
