use std::{
    fs::{File, FileTimes},
    path::Path,
    time::{Duration, SystemTime},
};

use patchwork::diff::CopyInsertPatcher;
use patchwork_test_utils::ZipBuilder;
use serde_json::Value;

/// Diff package with a manifest and a bundle patch from `baseline` to `target`.
pub fn diff_package(manifest: &Value, baseline: &[u8], target: &[u8]) -> ZipBuilder {
    ZipBuilder::new()
        .file("__diff.json", manifest.to_string())
        .file(
            "index.bundlejs.patch",
            CopyInsertPatcher::new().diff(baseline, target),
        )
}

/// Set both timestamps of `path` to `days` ago.
pub fn age(path: &Path, days: u64) {
    let t = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
    File::open(path)
        .unwrap()
        .set_times(FileTimes::new().set_modified(t).set_accessed(t))
        .unwrap();
}

/// Relative paths of all files under `root`, sorted.
pub fn file_set(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    out.sort();
    out
}
