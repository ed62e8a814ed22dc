//! Core data model for NID entries and firmware versions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::nid::Nid;

/// A firmware version tag (e.g. `1.50`, `6.60`).
///
/// Plain string comparison gives chronological order in this domain, so the
/// derived `Ord` is the version ordering used everywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub String);

impl Version {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed (NID, candidate name) pairing for a library.
///
/// `versions` is the set of firmware releases in which this exact pairing was
/// observed. `source` is an opaque provenance note from whatever tool
/// supplied the name (e.g. cross-version binary matching).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NidEntry {
    pub nid: Nid,
    pub name: String,
    pub library: String,
    pub versions: BTreeSet<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl NidEntry {
    pub fn new(nid: Nid, name: impl Into<String>, library: impl Into<String>) -> Self {
        Self {
            nid,
            name: name.into(),
            library: library.into(),
            versions: BTreeSet::new(),
            source: None,
        }
    }

    /// Builder-style helper to attach observed versions.
    pub fn with_versions<I, V>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.versions = versions.into_iter().map(|v| Version::new(v)).collect();
        self
    }

    /// Builder-style helper to attach a provenance note.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Group entries by library name, preserving entry order within each group.
///
/// The map is ordered by library name so batch processing is deterministic.
pub fn group_by_library(entries: &[NidEntry]) -> BTreeMap<String, Vec<&NidEntry>> {
    let mut by_lib: BTreeMap<String, Vec<&NidEntry>> = BTreeMap::new();
    for entry in entries {
        by_lib.entry(entry.library.clone()).or_default().push(entry);
    }
    by_lib
}

/// Select the entries present at a given firmware version, in input order.
pub fn entries_at<'a>(entries: &[&'a NidEntry], version: &Version) -> Vec<&'a NidEntry> {
    entries.iter().filter(|e| e.versions.contains(version)).copied().collect()
}

/// The sorted set of all versions appearing in any of the given entries.
pub fn version_sequence(entries: &[&NidEntry]) -> Vec<Version> {
    let set: BTreeSet<&Version> = entries.iter().flat_map(|e| &e.versions).collect();
    set.into_iter().cloned().collect()
}

/// Collect the set of NIDs present at a given version.
pub fn nids_at(entries: &[&NidEntry], version: &Version) -> BTreeSet<Nid> {
    entries
        .iter()
        .filter(|e| e.versions.contains(version))
        .map(|e| e.nid)
        .collect()
}
