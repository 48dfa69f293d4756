#![forbid(unsafe_code)]

//! Materializes the `copies` of a [`DiffManifest`](patchwork_diff::DiffManifest)
//! that the patch artifact did not ship literally.
//!
//! Two baselines are supported:
//! - the host package and its split archives ([`resolve_from_host`]),
//!   looked up through a [`ResourceIndex`] with density fallback;
//! - a previously installed version directory ([`resolve_from_previous`]).
//!
//! Missing sources are a best-effort degradation: they are logged and
//! reported, never fatal. Path escapes always are.

mod density;
mod error;
mod host;
mod index;
mod previous;
mod report;

pub use density::{DENSITY_PRIORITY, density_variants};
pub use error::{ResolveError, ResolveResult};
pub use host::resolve_from_host;
pub use index::ResourceIndex;
pub use previous::resolve_from_previous;
pub use report::ResolveReport;
