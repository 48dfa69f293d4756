#![forbid(unsafe_code)]

//! Update tasks and the engine context that runs them.
//!
//! An [`UpdateContext`] owns one version root. Each `download_*` method
//! builds an [`UpdateTask`], hands it to the [`Orchestrator`] and returns a
//! [`TaskHandle`] that resolves exactly once:
//!
//! ```text
//! Pending → Downloading → Applying → Succeeded | Failed
//! ```
//!
//! Network transfer is async; extraction, patching, resource reconciliation
//! and retention run on the blocking pool.

mod apply;
mod config;
mod context;
mod download;
mod error;
mod guard;
mod host;
mod orchestrator;
mod task;

#[cfg(any(test, feature = "test-utils"))]
pub use crate::host::MockHostRuntime;
pub use crate::{
    config::{DEFAULT_BUNDLE_FILE, UpdateConfig},
    context::UpdateContext,
    download::Downloader,
    error::{UpdateError, UpdateResult},
    host::{DEFAULT_BUNDLE_ENTRY, HostRuntime, PackageHost},
    orchestrator::Orchestrator,
    task::{TaskHandle, TaskKind, TaskOutcome, TaskState, UpdateTask},
};
