#![forbid(unsafe_code)]

/// What a resolver pass did, by destination path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Destinations written, in processing order.
    pub materialized: Vec<String>,
    /// `(requested source, source actually used)` for every density fallback.
    pub fallbacks: Vec<(String, String)>,
    /// Destinations with no usable source.
    pub skipped: Vec<String>,
    /// Destinations whose copy failed with an I/O error.
    pub failed: Vec<String>,
    /// Files copied from the remaining baseline tree (previous-package mode).
    pub tree_copied: usize,
}

impl ResolveReport {
    /// `true` when every requested destination was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}
