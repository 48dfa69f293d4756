#![forbid(unsafe_code)]

//! Safe extraction of zip-style update packages.
//!
//! Every entry written to disk is resolved under the destination root and
//! checked against the canonical root before a byte is written.

mod archive;
mod error;

pub use archive::{ExtractReport, PackageArchive};
pub use error::{ArchiveError, ArchiveResult};
