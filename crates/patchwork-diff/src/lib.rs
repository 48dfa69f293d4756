#![forbid(unsafe_code)]

//! Contents of a diff-type update package.
//!
//! A patch artifact carries two reserved entries: the reconciliation
//! manifest ([`MANIFEST_ENTRY`]) and the binary diff of the executable
//! bundle ([`BUNDLE_PATCH_ENTRY`]). Everything else in the artifact is a
//! literal file of the new version.

mod error;
mod manifest;
mod patch;

pub use error::{DiffError, DiffResult};
pub use manifest::DiffManifest;
pub use patch::{BinaryPatcher, CopyInsertPatcher};

/// Archive entry holding the [`DiffManifest`] document.
pub const MANIFEST_ENTRY: &str = "__diff.json";

/// Archive entry holding the binary diff of the executable bundle.
pub const BUNDLE_PATCH_ENTRY: &str = "index.bundlejs.patch";

/// `true` for entries that must never be extracted literally.
#[must_use]
pub fn is_reserved_entry(name: &str) -> bool {
    name == MANIFEST_ENTRY || name == BUNDLE_PATCH_ENTRY
}
