//! Common rstest fixtures.

use rstest::fixture;
use tempfile::TempDir;

/// Fresh temporary directory, removed on drop.
#[fixture]
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// Install a `fmt` subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
