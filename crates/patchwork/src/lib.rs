#![forbid(unsafe_code)]

//! # Patchwork
//!
//! Facade crate for the incremental over-the-air update engine.
//!
//! ## Quick start
//!
//! ```ignore
//! use patchwork::prelude::*;
//!
//! let host = PackageHost::new("/data/app/base.apk", "1.4.0");
//! let ctx = UpdateContext::new(
//!     UpdateConfig::new("/data/user/0/app/files/_update"),
//!     Arc::new(host),
//!     Arc::new(CopyInsertPatcher::new()),
//! )?;
//!
//! ctx.download_patch_from_package(url, "a1b2c3").wait().await?;
//! ctx.switch_version("a1b2c3")?;
//! ```

// ── Re-export sub-crates ────────────────────────────────────────────────

pub mod archive {
    pub use patchwork_archive::*;
}

pub mod diff {
    pub use patchwork_diff::*;
}

pub mod events {
    pub use patchwork_events::*;
}

pub mod net {
    pub use patchwork_net::*;
}

pub mod resolve {
    pub use patchwork_resolve::*;
}

pub mod storage {
    pub use patchwork_storage::*;
}

pub mod versions {
    pub use patchwork_versions::*;
}

// ── Engine ──────────────────────────────────────────────────────────────

pub use patchwork_update::*;

// ── Prelude ─────────────────────────────────────────────────────────────

pub mod prelude {
    pub use std::sync::Arc;

    pub use patchwork_diff::{BinaryPatcher, CopyInsertPatcher};
    pub use patchwork_events::{DownloadEvent, Event, EventBus, TaskEvent};
    pub use patchwork_net::NetOptions;
    pub use patchwork_update::{
        HostRuntime, PackageHost, TaskHandle, TaskOutcome, UpdateConfig, UpdateContext,
        UpdateError, UpdateResult,
    };
    pub use patchwork_versions::RetentionPolicy;
}
