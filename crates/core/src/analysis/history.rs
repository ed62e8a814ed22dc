//! Full-history orchestration for one library, and the all-libraries batch.

use serde::{Deserialize, Serialize};

use crate::analysis::classify::{classify_version, VersionBuckets};
use crate::analysis::detect::detect_randomization;
use crate::analysis::diagnostics::Diagnostic;
use crate::analysis::state::LibraryState;
use crate::model::{self, NidEntry, Version};
use crate::nid::NidHasher;

/// Classification outcome for one version of one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionReport {
    pub version: Version,
    pub buckets: VersionBuckets,
    /// Sticky state: the library has been randomized at this or an earlier
    /// boundary.
    pub randomized: bool,
    /// Boundary event: randomization was detected at the transition into
    /// this exact version. Reporting layers mark these versions.
    pub randomized_here: bool,
}

/// The complete classification history of one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryHistory {
    pub library: String,
    pub versions: Vec<VersionReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LibraryHistory {
    /// The sticky randomization flag after the last version.
    pub fn finally_randomized(&self) -> bool {
        self.versions.last().map(|v| v.randomized).unwrap_or(false)
    }
}

/// Run the full history for one library.
///
/// Versions are processed in chronological order. The first version is
/// always classified as a non-randomized baseline, there being no earlier
/// version to diff against. Every subsequent version first runs the
/// randomization detector against its immediate predecessor; a detection is
/// ORed into the sticky flag, which never reverts.
pub fn analyze_library(
    library: &str,
    entries: &[&NidEntry],
    hasher: &dyn NidHasher,
) -> LibraryHistory {
    let sequence = model::version_sequence(entries);
    let mut state = LibraryState::new();
    let mut diagnostics = Vec::new();
    let mut versions = Vec::with_capacity(sequence.len());

    let mut prev_version: Option<&Version> = None;
    for version in &sequence {
        let current = model::entries_at(entries, version);
        let randomized_here = match prev_version {
            None => false,
            Some(prev) => {
                let prev_nids = model::nids_at(entries, prev);
                detect_randomization(&prev_nids, &current, prev, hasher)
            }
        };
        state.randomized |= randomized_here;

        let buckets =
            classify_version(library, version, &current, &mut state, hasher, &mut diagnostics);
        versions.push(VersionReport {
            version: version.clone(),
            buckets,
            randomized: state.randomized,
            randomized_here,
        });
        prev_version = Some(version);
    }

    LibraryHistory { library: library.to_string(), versions, diagnostics }
}

/// Run every library found in `entries`, in library-name order.
///
/// Each library's run owns its state exclusively; libraries are independent
/// of one another, so a caller needing throughput can fan the groups out to
/// worker threads without sharing anything.
pub fn analyze_all(entries: &[NidEntry], hasher: &dyn NidHasher) -> Vec<LibraryHistory> {
    model::group_by_library(entries)
        .into_iter()
        .map(|(library, group)| analyze_library(&library, &group, hasher))
        .collect()
}
