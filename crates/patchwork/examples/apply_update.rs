//! Example: download and activate an update for a host package on disk.
//!
//! - `PackageHost::new(apk, version)` describes the installed host package
//! - `UpdateContext` downloads into `<root>/<hash>/` and reports progress
//! - `switch_version` + `resolve_bundle` pick the bundle for the next launch
//!
//! Run with:
//! ```
//! cargo run -p patchwork --example apply_update -- <host.apk> <root> <url> <hash> [origin-hash]
//! ```
//!
//! Without `origin-hash` the URL is treated as a diff against the host
//! package; with it, as a diff against that installed version.

use std::{env::args, error::Error};

use patchwork::prelude::*;
use tracing::{info, metadata::LevelFilter, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy()
                .add_directive("patchwork_net=warn".parse()?),
        )
        .with_line_number(false)
        .with_file(false)
        .init();

    let mut args = args().skip(1);
    let usage = "usage: apply_update <host.apk> <root> <url> <hash> [origin-hash]";
    let (Some(apk), Some(root), Some(url), Some(hash)) =
        (args.next(), args.next(), args.next(), args.next())
    else {
        return Err(usage.into());
    };
    let origin = args.next();
    let url = Url::parse(&url)?;

    let host = PackageHost::new(&apk, "demo");
    let ctx = UpdateContext::new(
        UpdateConfig::new(&root),
        Arc::new(host),
        Arc::new(CopyInsertPatcher::new()),
    )?;

    let mut events = ctx.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Download(progress) => info!(percent = ?progress.percent(), "downloading"),
                Event::Task(task) => info!(?task),
            }
        }
    });

    let handle = match origin.as_deref() {
        Some(origin) => ctx.download_patch_from_ppk(url, &hash, origin),
        None => ctx.download_patch_from_package(url, &hash),
    };
    match handle.wait().await? {
        TaskOutcome::Installed {
            dir,
            resources: Some(report),
            ..
        } if !report.is_complete() => {
            warn!(dir = %dir.display(), skipped = ?report.skipped, "installed with missing resources");
        }
        outcome => info!(?outcome, "installed"),
    }

    ctx.switch_version(&hash)?;
    info!(bundle = ?ctx.resolve_bundle()?, "next launch");
    Ok(())
}
