#![forbid(unsafe_code)]

//! Filesystem primitives shared by every component that writes under a
//! version root.
//!
//! - [`resolve_within`] / [`prepare_target`]: containment of relative paths.
//! - [`write_atomic`]: crash-safe whole-file replacement.
//! - [`remove_tree`] / [`copy_tree_filtered`]: iterative traversal, no recursion.

mod atomic;
mod error;
mod path;
mod tree;

pub use atomic::write_atomic;
pub use error::{StorageError, StorageResult};
pub use path::{prepare_target, resolve_within, sanitize_rel, validate_segment};
pub use tree::{CopyStats, copy_file, copy_tree_filtered, remove_tree};
