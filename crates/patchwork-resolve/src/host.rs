#![forbid(unsafe_code)]

use std::{collections::HashSet, path::Path};

use patchwork_diff::DiffManifest;
use patchwork_storage::{copy_file, prepare_target};
use tracing::{debug, info, warn};

use crate::{ResolveError, ResolveReport, ResolveResult, ResourceIndex, density_variants};

/// Materialize manifest copies from the host package archives into `out_dir`.
///
/// Destinations listed in `satisfied` (entries the patch shipped literally,
/// the patched bundle) are left alone. Each remaining source is extracted
/// once; further destinations of the same source are copied from the first.
pub fn resolve_from_host(
    manifest: &DiffManifest,
    index: &mut ResourceIndex,
    out_dir: &Path,
    satisfied: &HashSet<String>,
) -> ResolveResult<ResolveReport> {
    let mut report = ResolveReport::default();

    for (source, dests) in manifest.destinations_by_source() {
        let dests: Vec<&str> = dests
            .into_iter()
            .filter(|d| !satisfied.contains(*d))
            .collect();
        let Some(&first_dest) = dests.first() else {
            continue;
        };

        let Some(actual) = locate(manifest, index, source, first_dest) else {
            warn!(source, dest = first_dest, "resource not found in host package, skipping");
            report.skipped.extend(dests.iter().map(|d| (*d).to_string()));
            continue;
        };
        if actual != source {
            debug!(source, fallback = %actual, "density fallback");
            report.fallbacks.push((source.to_string(), actual.clone()));
        }

        let mut written: Option<std::path::PathBuf> = None;
        for dest in dests {
            let result = prepare_target(out_dir, dest)
                .map_err(ResolveError::from)
                .and_then(|target| {
                    match &written {
                        Some(first) => copy_file(first, &target).map_err(ResolveError::from),
                        None => index.extract(&actual, &target).map(|_| 0),
                    }
                    .map(|_| target)
                });
            match result {
                Ok(target) => {
                    written.get_or_insert(target);
                    report.materialized.push(dest.to_string());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(source = %actual, dest, error = %e, "resource copy failed");
                    report.failed.push(dest.to_string());
                }
            }
        }
    }

    info!(
        materialized = report.materialized.len(),
        fallbacks = report.fallbacks.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "host resources resolved"
    );
    Ok(report)
}

/// Source entry to use for `source`, or `None` when nothing usable exists.
///
/// Tried in order: the literal source; density variants of `dest` that are
/// themselves manifest destinations with an indexed source; density variants
/// of `source` that are manifest sources present in the index.
fn locate(
    manifest: &DiffManifest,
    index: &ResourceIndex,
    source: &str,
    dest: &str,
) -> Option<String> {
    if index.contains(source) {
        return Some(source.to_string());
    }
    let by_dest = density_variants(dest).into_iter().find_map(|candidate| {
        manifest
            .source_for(&candidate)
            .filter(|s| index.contains(s))
            .map(str::to_string)
    });
    if by_dest.is_some() {
        return by_dest;
    }
    density_variants(source)
        .into_iter()
        .find(|candidate| manifest.is_source(candidate) && index.contains(candidate))
}
