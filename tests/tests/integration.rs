//! All integration tests for patchwork
#![expect(
    clippy::unwrap_used,
    reason = "integration test crate: unwraps are acceptable in test code"
)]

mod common;
mod patchwork_properties;
mod patchwork_scenarios;
