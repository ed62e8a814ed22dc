//! Accumulating per-library state threaded through a history run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Version;
use crate::nid::Nid;

/// Where and under what name a NID was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    pub version: Version,
    pub name: String,
}

impl Sighting {
    pub fn new(version: &Version, name: &str) -> Self {
        Self { version: version.clone(), name: name.to_string() }
    }
}

/// Mutable state owned exclusively by one library history run.
///
/// Both maps only ever grow, and `randomized` never transitions back to
/// false once set. Keeping the state an explicit owned object (rather than
/// anything shared) is what makes distinct libraries safe to process on
/// separate workers.
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    /// Sticky flag: the library's NIDs were re-randomized at some earlier
    /// (or the current) version boundary.
    pub randomized: bool,
    /// First hash-verification success per NID.
    pub confirmed: BTreeMap<Nid, Sighting>,
    /// First sighting per NID while the library was not yet randomized.
    pub pre_randomization: BTreeMap<Nid, Sighting>,
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hash-verified name for `nid`, keeping the first one seen.
    pub fn record_confirmed(&mut self, nid: Nid, version: &Version, name: &str) {
        self.confirmed.entry(nid).or_insert_with(|| Sighting::new(version, name));
    }

    /// Record a pre-randomization sighting for `nid`, keeping the first one.
    pub fn record_pre_randomization(&mut self, nid: Nid, version: &Version, name: &str) {
        self.pre_randomization.entry(nid).or_insert_with(|| Sighting::new(version, name));
    }

    /// Whether any confirmed NID carries exactly this name.
    pub fn has_confirmed_name(&self, name: &str) -> bool {
        self.confirmed.values().any(|s| s.name == name)
    }
}
