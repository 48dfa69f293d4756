//! Security and completeness properties of update tasks.

use std::{fs, time::Duration};

use patchwork::UpdateError;
use patchwork_test_utils::{TestHttpServer, ZipBuilder, static_file_router};
use rstest::*;
use serde_json::json;

use crate::common::{ORIGIN_BUNDLE, Workspace, diff_package, workspace};

#[rstest]
#[case::parent("../outside.txt")]
#[case::nested_parent("assets/../../outside.txt")]
#[case::absolute("/outside.txt")]
#[case::backslash("..\\outside.txt")]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn escaping_entry_aborts_full_package(workspace: Workspace, #[case] entry: &str) {
    let package = ZipBuilder::new()
        .file("index.bundlejs", "bundle")
        .file(entry, "pwned")
        .build();
    let server = TestHttpServer::new(static_file_router(vec![("/h1.ppk", package)])).await;
    let ctx = workspace.engine();

    let err = ctx
        .download_full_update(server.url("/h1.ppk"), "h1")
        .wait()
        .await
        .unwrap_err();

    assert!(err.is_security_violation(), "{err:?}");
    assert!(!workspace.dir.path().join("outside.txt").exists());
    assert!(!workspace.root().join("outside.txt").exists());
    assert!(!ctx.root().version_dir("h1").unwrap().exists());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn escaping_copy_source_aborts_previous_diff(workspace: Workspace) {
    fs::write(workspace.dir.path().join("secret.txt"), "secret").unwrap();
    let base = ZipBuilder::new().file("index.bundlejs", "v1").build();
    let diff = diff_package(
        &json!({ "copies": { "stolen.txt": "../../secret.txt" }, "deletes": {} }),
        b"v1",
        b"v2",
    )
    .build();
    let server = TestHttpServer::new(static_file_router(vec![
        ("/h1.ppk", base),
        ("/h2.ppk.patch", diff),
    ]))
    .await;
    let ctx = workspace.engine();
    ctx.download_full_update(server.url("/h1.ppk"), "h1")
        .wait()
        .await
        .unwrap();

    let err = ctx
        .download_patch_from_ppk(server.url("/h2.ppk.patch"), "h2", "h1")
        .wait()
        .await
        .unwrap_err();

    assert!(err.is_security_violation(), "{err:?}");
    assert!(!ctx.root().version_dir("h2").unwrap().exists());
}

#[rstest]
#[case::only_assets(ZipBuilder::new().file("assets/a.png", "a"))]
#[case::only_manifest(ZipBuilder::new().file("__diff.json", r#"{"copies":{},"deletes":{}}"#))]
#[case::only_patch(ZipBuilder::new().file("index.bundlejs.patch", "p"))]
#[case::many_entries_without_patch(
    (0..20).fold(
        ZipBuilder::new().file("__diff.json", r#"{"copies":{},"deletes":{}}"#),
        |b, i| b.file(&format!("assets/{i}.png"), "x"),
    )
)]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn diff_without_reserved_entries_is_incomplete(
    workspace: Workspace,
    #[case] package: ZipBuilder,
) {
    let server = TestHttpServer::new(static_file_router(vec![("/p", package.build())])).await;
    let ctx = workspace.engine();

    let err = ctx
        .download_patch_from_package(server.url("/p"), "h9")
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::IncompletePackage { .. }), "{err:?}");
    assert!(!ctx.root().version_dir("h9").unwrap().exists());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn corrupt_bundle_patch_fails_task(workspace: Workspace) {
    let mut patch = patchwork::diff::CopyInsertPatcher::new().diff(ORIGIN_BUNDLE, b"new bundle");
    let last = patch.len() - 2;
    patch[last] ^= 0xff;
    let package = ZipBuilder::new()
        .file("__diff.json", r#"{"copies":{},"deletes":{}}"#)
        .file("index.bundlejs.patch", patch)
        .build();
    let server = TestHttpServer::new(static_file_router(vec![("/p", package)])).await;
    let ctx = workspace.engine();

    let err = ctx
        .download_patch_from_package(server.url("/p"), "h7")
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::CorruptPatch(_)), "{err:?}");
    assert!(!ctx.root().version_dir("h7").unwrap().exists());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn missing_baseline_version_fails(workspace: Workspace) {
    let diff = diff_package(&json!({ "copies": {}, "deletes": {} }), b"v1", b"v2").build();
    let server = TestHttpServer::new(static_file_router(vec![("/p", diff)])).await;
    let ctx = workspace.engine();

    let err = ctx
        .download_patch_from_ppk(server.url("/p"), "h2", "gone")
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::VersionNotFound { ref hash } if hash == "gone"));
}
