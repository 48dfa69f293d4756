#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use indexmap::IndexMap;
use patchwork_storage::sanitize_rel;
use serde::Deserialize;
use tracing::debug;

use crate::{DiffError, DiffResult};

/// `deletes` is published either as an object keyed by path or as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDeletes {
    Keys(IndexMap<String, serde_json::Value>),
    List(Vec<String>),
}

#[derive(Deserialize)]
struct RawManifest {
    copies: IndexMap<String, String>,
    deletes: RawDeletes,
}

/// Reconciliation manifest of a diff package.
///
/// `copies` maps destination paths (relative to the new version root) to
/// source paths in the baseline, preserving document order. Destinations
/// are normalized and guaranteed not to escape the output root; an empty
/// source has already been replaced with its destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffManifest {
    copies: IndexMap<String, String>,
    deletes: BTreeSet<String>,
}

impl DiffManifest {
    /// Parse a manifest document.
    pub fn parse(bytes: &[u8]) -> DiffResult<Self> {
        let raw: RawManifest = serde_json::from_slice(bytes)?;

        let mut copies = IndexMap::with_capacity(raw.copies.len());
        for (dest, source) in raw.copies {
            let clean =
                sanitize_rel(&dest).map_err(|_| DiffError::PathTraversal { path: dest.clone() })?;
            let source = if source.is_empty() {
                clean.clone()
            } else {
                source
            };
            if copies.insert(clean.clone(), source).is_some() {
                return Err(DiffError::ManifestFormat(format!(
                    "duplicate destination {clean:?}"
                )));
            }
        }

        let deletes: BTreeSet<String> = match raw.deletes {
            RawDeletes::Keys(map) => map.into_keys().collect(),
            RawDeletes::List(list) => list.into_iter().collect(),
        };

        debug!(copies = copies.len(), deletes = deletes.len(), "manifest parsed");
        Ok(Self { copies, deletes })
    }

    /// Destination → source pairs in document order.
    pub fn copies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.copies.iter().map(|(d, s)| (d.as_str(), s.as_str()))
    }

    #[must_use]
    pub fn source_for(&self, dest: &str) -> Option<&str> {
        self.copies.get(dest).map(String::as_str)
    }

    #[must_use]
    pub fn is_destination(&self, dest: &str) -> bool {
        self.copies.contains_key(dest)
    }

    /// Whether `source` is the source of at least one destination.
    #[must_use]
    pub fn is_source(&self, source: &str) -> bool {
        self.copies.values().any(|s| s == source)
    }

    /// Sources with all of their destinations, both in document order.
    #[must_use]
    pub fn destinations_by_source(&self) -> IndexMap<&str, Vec<&str>> {
        let mut grouped: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (dest, source) in &self.copies {
            grouped.entry(source.as_str()).or_default().push(dest.as_str());
        }
        grouped
    }

    /// Baseline keys excluded from a previous-package copy.
    ///
    /// File keys are `dir/name`; directory keys end with `/`.
    #[must_use]
    pub fn deletes(&self) -> &BTreeSet<String> {
        &self.deletes
    }

    #[must_use]
    pub fn is_deleted(&self, key: &str) -> bool {
        self.deletes.contains(key)
    }

    #[must_use]
    pub fn copies_len(&self) -> usize {
        self.copies.len()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_source_means_same_path() {
        let m = DiffManifest::parse(br#"{"copies":{"a.txt":"","b.txt":"old/b.txt"},"deletes":{}}"#)
            .unwrap();
        assert_eq!(m.source_for("a.txt"), Some("a.txt"));
        assert_eq!(m.source_for("b.txt"), Some("old/b.txt"));
        assert!(m.is_source("old/b.txt"));
        assert!(!m.is_source("b.txt"));
    }

    #[rstest]
    #[case(br#"{"copies":{},"deletes":{"b.txt":1,"assets/old/":true}}"#)]
    #[case(br#"{"copies":{},"deletes":["b.txt","assets/old/"]}"#)]
    fn deletes_accept_object_or_list(#[case] doc: &[u8]) {
        let m = DiffManifest::parse(doc).unwrap();
        assert!(m.is_deleted("b.txt"));
        assert!(m.is_deleted("assets/old/"));
        assert_eq!(m.deletes().len(), 2);
    }

    #[rstest]
    #[case(&b"not json"[..])]
    #[case(&br#"{"deletes":{}}"#[..])]
    #[case(&br#"{"copies":{}}"#[..])]
    #[case(&br#"{"copies":[],"deletes":{}}"#[..])]
    #[case(&br#"{"copies":{"a":1},"deletes":{}}"#[..])]
    #[case(&br#"{"copies":{"a":"","./a":""},"deletes":{}}"#[..])]
    fn malformed_documents(#[case] doc: &[u8]) {
        assert!(matches!(
            DiffManifest::parse(doc),
            Err(DiffError::ManifestFormat(_))
        ));
    }

    #[rstest]
    #[case("../outside.txt")]
    #[case("/etc/passwd")]
    #[case("assets/../../x")]
    #[case("..\\x")]
    fn hostile_destinations_are_rejected(#[case] dest: &str) {
        let doc = serde_json::json!({ "copies": { dest: "" }, "deletes": {} }).to_string();
        assert!(matches!(
            DiffManifest::parse(doc.as_bytes()),
            Err(DiffError::PathTraversal { .. })
        ));
    }

    #[test]
    fn groups_destinations_by_source_in_order() {
        let m = DiffManifest::parse(
            br#"{"copies":{
                "res/a.png":"res/shared.png",
                "res/x.png":"",
                "res/b.png":"res/shared.png"
            },"deletes":{}}"#,
        )
        .unwrap();
        let grouped = m.destinations_by_source();
        let keys: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(keys, vec!["res/shared.png", "res/x.png"]);
        assert_eq!(grouped["res/shared.png"], vec!["res/a.png", "res/b.png"]);
    }
}
