#![forbid(unsafe_code)]

use std::{io::Write, path::Path};

use crate::{StorageError, StorageResult};

/// Replace `path` with `data` so readers observe either the old or the new
/// contents, never a torn write.
///
/// The temp file lives in the target's parent directory (same filesystem,
/// so the final rename is atomic).
pub fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Failed("atomic write: no parent dir".to_string()))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| StorageError::Failed(format!("atomic write tmpfile: {e}")))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    // `persist()` renames over the target and disarms the auto-delete on drop.
    tmp.persist(path)
        .map_err(|e| StorageError::Failed(format!("atomic rename: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second, longer").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second, longer");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"{}").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
    }
}
