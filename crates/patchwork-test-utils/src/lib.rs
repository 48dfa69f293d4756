#![forbid(unsafe_code)]
#![expect(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test utility crate: unwraps are acceptable"
)]
#![expect(
    clippy::missing_panics_doc,
    reason = "test utility crate: panic documentation not needed"
)]

//! Shared test utilities for the patchwork workspace.

pub mod fixtures;
pub mod http_server;
pub mod zip_builder;

pub use fixtures::*;
pub use http_server::{TestHttpServer, static_file_router};
pub use zip_builder::ZipBuilder;
