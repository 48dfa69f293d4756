//! End-to-end update scenarios through `UpdateContext`.

use std::{fs, sync::Arc, time::Duration};

use patchwork::{TaskOutcome, UpdateError};
use patchwork_test_utils::{TestHttpServer, ZipBuilder, static_file_router};
use rstest::*;
use serde_json::json;

use crate::common::{ORIGIN_BUNDLE, ScriptedNet, Workspace, age, diff_package, file_set, workspace};

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn full_package_output_matches_archive_entries(workspace: Workspace) {
    let package = ZipBuilder::new()
        .file("index.bundlejs", "bundle")
        .file("assets/fonts/Inter.ttf", "font")
        .file("assets/img/a.png", "a")
        .dir("assets/empty/")
        .build();
    let server = TestHttpServer::new(static_file_router(vec![("/h1.ppk", package)])).await;
    let ctx = workspace.engine();

    ctx.download_full_update(server.url("/h1.ppk"), "h1")
        .wait()
        .await
        .unwrap();

    let dir = ctx.root().version_dir("h1").unwrap();
    assert_eq!(
        file_set(&dir),
        vec!["assets/fonts/Inter.ttf", "assets/img/a.png", "index.bundlejs"]
    );
    assert!(dir.join("assets/empty").is_dir());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn diff_from_previous_drops_deleted_entries(workspace: Workspace) {
    let base = ZipBuilder::new()
        .file("index.bundlejs", "v1")
        .file("a.txt", "a")
        .file("b.txt", "b")
        .file("c.txt", "c")
        .build();
    let diff = diff_package(
        &json!({ "copies": { "a.txt": "" }, "deletes": { "b.txt": 1 } }),
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
    ctx.download_patch_from_ppk(server.url("/h2.ppk.patch"), "h2", "h1")
        .wait()
        .await
        .unwrap();

    let dir = ctx.root().version_dir("h2").unwrap();
    assert_eq!(file_set(&dir), vec!["a.txt", "c.txt", "index.bundlejs"]);
    assert_eq!(fs::read_to_string(dir.join("index.bundlejs")).unwrap(), "v2");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn diff_from_host_falls_back_to_mapped_density(workspace: Workspace) {
    let manifest = json!({
        "copies": {
            "assets/icon.png": "res/drawable-xxhdpi/icon.png",
            "assets/icon-small.png": "res/drawable-mdpi/icon.png",
            "assets/click.ogg": "res/raw/click.ogg"
        },
        "deletes": {}
    });
    let target = b"__d('host bundle v2');";
    let diff = diff_package(&manifest, ORIGIN_BUNDLE, target).build();
    let server = TestHttpServer::new(static_file_router(vec![("/h2.apk.patch", diff)])).await;
    let ctx = workspace.engine();

    let outcome = ctx
        .download_patch_from_package(server.url("/h2.apk.patch"), "h2")
        .wait()
        .await
        .unwrap();

    let TaskOutcome::Installed { dir, resources, .. } = outcome else {
        panic!("not installed");
    };
    assert_eq!(fs::read(dir.join("assets/icon.png")).unwrap(), b"mdpi icon");
    assert_eq!(fs::read(dir.join("assets/icon-small.png")).unwrap(), b"mdpi icon");
    assert_eq!(fs::read(dir.join("assets/click.ogg")).unwrap(), b"click");
    assert_eq!(fs::read(dir.join("index.bundlejs")).unwrap(), target);
    let report = resources.unwrap();
    assert_eq!(
        report.fallbacks,
        vec![(
            "res/drawable-xxhdpi/icon.png".to_string(),
            "res/drawable-mdpi/icon.png".to_string()
        )]
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn stalled_download_is_truncated_and_cleaned(workspace: Workspace) {
    let ctx = workspace.engine_with_net(Arc::new(ScriptedNet {
        declared: 1000,
        sent: 800,
    }));
    let url = url::Url::parse("http://updates.invalid/h1.ppk").unwrap();

    let err = ctx.download_full_update(url, "h1").wait().await.unwrap_err();

    assert!(matches!(
        err,
        UpdateError::TruncatedTransfer {
            received: 800,
            expected: 1000
        }
    ));
    assert!(!ctx.root().full_staging("h1").unwrap().exists());
    assert!(!ctx.root().version_dir("h1").unwrap().exists());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn retention_removes_only_old_unpinned_versions(workspace: Workspace) {
    let server = TestHttpServer::new(static_file_router(vec![(
        "/c.ppk",
        ZipBuilder::new().file("index.bundlejs", "c").build(),
    )]))
    .await;
    let ctx = workspace.engine();
    let root = ctx.root().path().to_path_buf();

    ctx.download_full_update(server.url("/c.ppk"), "C")
        .wait()
        .await
        .unwrap();
    ctx.switch_version("C").unwrap();
    for (name, days) in [("A", 10), ("B", 2)] {
        fs::create_dir(root.join(name)).unwrap();
        age(&root.join(name), days);
    }
    age(&root.join("C"), 30);

    let TaskOutcome::Pruned(report) = ctx.clean_up().wait().await.unwrap() else {
        panic!("not a retention outcome");
    };

    assert_eq!(report.removed, vec!["A".to_string()]);
    assert!(!root.join("A").exists());
    assert!(root.join("B").exists());
    assert!(root.join("C/index.bundlejs").exists());
}
