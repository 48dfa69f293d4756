use std::{fs, path::Path, time::Duration};

use patchwork_test_utils::temp_dir;
use patchwork_versions::{VersionRoot, VersionStore, VersionsError};
use rstest::*;
use tempfile::TempDir;

const BUNDLE: &str = "index.bundlejs";

fn install(root: &Path, hash: &str) {
    fs::create_dir_all(root.join(hash)).unwrap();
    fs::write(root.join(hash).join(BUNDLE), hash).unwrap();
}

fn store(dir: &TempDir) -> VersionStore {
    VersionStore::open(VersionRoot::new(dir.path()), BUNDLE)
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn switch_requires_bundle(temp_dir: TempDir) {
    let store = store(&temp_dir);
    fs::create_dir_all(temp_dir.path().join("h1")).unwrap();

    let err = store.switch_version("h1").unwrap_err();
    assert!(matches!(err, VersionsError::VersionNotFound { hash } if hash == "h1"));
    assert_eq!(store.snapshot().current_version, None);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn switch_tracks_last_version_and_persists(temp_dir: TempDir) {
    install(temp_dir.path(), "h1");
    install(temp_dir.path(), "h2");
    let store = store(&temp_dir);

    store.switch_version("h1").unwrap();
    store.mark_success().unwrap();
    store.switch_version("h2").unwrap();

    let reopened = VersionStore::open(VersionRoot::new(temp_dir.path()), BUNDLE);
    let state = reopened.snapshot();
    assert_eq!(state.current_version.as_deref(), Some("h2"));
    assert_eq!(state.last_version.as_deref(), Some("h1"));
    assert!(state.first_time);
    assert!(!state.first_time_ok);

    let pinned: Vec<_> = reopened.retention_state().pinned().map(String::from).collect();
    assert_eq!(pinned, vec!["h1".to_string(), "h2".to_string()]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn confirmed_version_survives_relaunch(temp_dir: TempDir) {
    install(temp_dir.path(), "h1");
    install(temp_dir.path(), "h2");
    let store = store(&temp_dir);
    store.switch_version("h1").unwrap();
    store.switch_version("h2").unwrap();

    let first = store.resolve_bundle().unwrap();
    assert_eq!(first, Some(temp_dir.path().join("h2").join(BUNDLE)));
    store.mark_success().unwrap();

    let second = store.resolve_bundle().unwrap();
    assert_eq!(second, first);
    let state = store.snapshot();
    assert_eq!(state.last_version, None);
    assert_eq!(state.rolled_back_version, None);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn unconfirmed_version_rolls_back_on_second_launch(temp_dir: TempDir) {
    install(temp_dir.path(), "h1");
    install(temp_dir.path(), "h2");
    let store = store(&temp_dir);
    store.switch_version("h1").unwrap();
    store.mark_success().unwrap();
    store.switch_version("h2").unwrap();

    assert_eq!(
        store.resolve_bundle().unwrap(),
        Some(temp_dir.path().join("h2").join(BUNDLE))
    );
    // No mark_success: the launch crashed.
    assert_eq!(
        store.resolve_bundle().unwrap(),
        Some(temp_dir.path().join("h1").join(BUNDLE))
    );
    let state = store.snapshot();
    assert_eq!(state.current_version.as_deref(), Some("h1"));
    assert_eq!(state.rolled_back_version.as_deref(), Some("h2"));

    store.clear_rollback_mark().unwrap();
    assert_eq!(store.snapshot().rolled_back_version, None);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn missing_bundles_roll_back_to_host_package(temp_dir: TempDir) {
    install(temp_dir.path(), "h1");
    install(temp_dir.path(), "h2");
    let store = store(&temp_dir);
    store.switch_version("h1").unwrap();
    store.switch_version("h2").unwrap();
    store.mark_success().unwrap();
    fs::remove_dir_all(temp_dir.path().join("h2")).unwrap();

    assert_eq!(store.resolve_bundle().unwrap(), None);
    assert_eq!(store.snapshot().current_version, None);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn package_upgrade_resets_state(temp_dir: TempDir) {
    install(temp_dir.path(), "h1");
    let store = store(&temp_dir);

    assert!(!store.sync_package_version("1.0.0").unwrap());
    store.switch_version("h1").unwrap();
    assert!(!store.sync_package_version("1.0.0").unwrap());
    assert!(store.sync_package_version("1.1.0").unwrap());

    let state = store.snapshot();
    assert_eq!(state.package_version.as_deref(), Some("1.1.0"));
    assert_eq!(state.current_version, None);
    assert_eq!(store.resolve_bundle().unwrap(), None);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn corrupt_state_file_starts_fresh(temp_dir: TempDir) {
    fs::write(temp_dir.path().join(".state.json"), b"{not json").unwrap();
    let store = store(&temp_dir);
    assert_eq!(store.snapshot().current_version, None);
    store.clear_first_time().unwrap();
    assert!(
        looks_like_state(&fs::read(temp_dir.path().join(".state.json")).unwrap()),
        "state file rewritten"
    );
}

fn looks_like_state(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok_and(|s| s.trim_start().starts_with('{') && s.contains("first_time"))
}
