#![forbid(unsafe_code)]

/// Density buckets from highest to lowest resolution.
pub const DENSITY_PRIORITY: [&str; 6] = ["xxxhdpi", "xxhdpi", "xhdpi", "hdpi", "mdpi", "ldpi"];

const RESOURCE_KINDS: [&str; 2] = ["drawable", "mipmap"];

/// Rewrites of `path` into every density bucket, in priority order.
///
/// Only the first density-qualified `drawable-*` / `mipmap-*` directory is
/// rewritten; other qualifiers in that segment (`-v4`, `-ldrtl`, …) are kept.
/// Empty when `path` has no such segment.
#[must_use]
pub fn density_variants(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    let Some((seg_idx, qual_idx)) = dirs
        .iter()
        .enumerate()
        .find_map(|(i, seg)| density_qualifier(seg).map(|q| (i, q)))
    else {
        return Vec::new();
    };

    DENSITY_PRIORITY
        .iter()
        .map(|&density| {
            let mut qualifiers: Vec<&str> = segments[seg_idx].split('-').collect();
            qualifiers[qual_idx] = density;
            let rewritten = qualifiers.join("-");
            let mut out: Vec<&str> = segments.clone();
            out[seg_idx] = &rewritten;
            out.join("/")
        })
        .collect()
}

/// Index of the density qualifier within a `drawable-*` / `mipmap-*` segment.
fn density_qualifier(segment: &str) -> Option<usize> {
    let mut parts = segment.split('-');
    let kind = parts.next()?;
    if !RESOURCE_KINDS.contains(&kind) {
        return None;
    }
    parts
        .position(|q| DENSITY_PRIORITY.contains(&q))
        .map(|pos| pos + 1)
}
