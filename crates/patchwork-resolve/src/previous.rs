#![forbid(unsafe_code)]

use std::{collections::HashSet, path::Path};

use patchwork_diff::DiffManifest;
use patchwork_storage::{copy_file, copy_tree_filtered, prepare_target, resolve_within};
use tracing::{info, warn};

use crate::{ResolveError, ResolveReport, ResolveResult};

/// Materialize manifest copies from a previous version directory, then copy
/// the rest of that tree minus the manifest's `deletes`.
///
/// The tree copy never overwrites: anything already in `out_dir` (literal
/// entries, the patched bundle, explicit copies) wins over the baseline.
pub fn resolve_from_previous(
    manifest: &DiffManifest,
    baseline_dir: &Path,
    out_dir: &Path,
    satisfied: &HashSet<String>,
) -> ResolveResult<ResolveReport> {
    let mut report = ResolveReport::default();

    for (dest, source) in manifest.copies() {
        if satisfied.contains(dest) {
            continue;
        }
        let src = resolve_within(baseline_dir, source)?;
        if !src.is_file() {
            warn!(source, dest, "resource missing from baseline, skipping");
            report.skipped.push(dest.to_string());
            continue;
        }
        let result = prepare_target(out_dir, dest)
            .map_err(ResolveError::from)
            .and_then(|target| copy_file(&src, &target).map_err(ResolveError::from));
        match result {
            Ok(_) => report.materialized.push(dest.to_string()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(source, dest, error = %e, "resource copy failed");
                report.failed.push(dest.to_string());
            }
        }
    }

    let stats = copy_tree_filtered(baseline_dir, out_dir, |key| manifest.is_deleted(key))
        .map_err(ResolveError::from)?;
    report.tree_copied = stats.copied;

    info!(
        materialized = report.materialized.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        tree_copied = stats.copied,
        excluded = stats.excluded,
        "baseline resources resolved"
    );
    Ok(report)
}
