#![forbid(unsafe_code)]

//! Everything that lives directly under a version root.
//!
//! ```text
//! <root>/
//!   .state.json                 persisted VersionState
//!   <hash>/                     one fully materialized version
//!   <hash>.ppk                  staging files of in-flight downloads
//!   <origin>_<hash>.ppk.patch
//! ```

mod error;
mod layout;
mod retention;
mod state;

pub use error::{VersionsError, VersionsResult};
pub use layout::VersionRoot;
pub use retention::{RetentionPolicy, RetentionReport, RetentionState, prune};
pub use state::{VersionState, VersionStore};
