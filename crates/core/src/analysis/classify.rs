//! Per-version classification of a library's entries into status buckets.

use serde::{Deserialize, Serialize};

use crate::analysis::diagnostics::{Diagnostic, DiagnosticKind};
use crate::analysis::state::LibraryState;
use crate::model::{NidEntry, Version};
use crate::nid::{self, NidHasher};

/// Status of one (NID, name) pairing at one version.
///
/// `Known`, `Unknown`, and `Mismatched` are the buckets of a version whose
/// library is not randomized; `Known` plus the remaining four are the
/// buckets once the library's identifier space has been randomized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NidStatus {
    /// Name hash-verifies against the NID.
    Known,
    /// Placeholder name; true name unknown.
    Unknown,
    /// Name present but does not hash-verify.
    Mismatched,
    /// Unverifiable under randomization, but the name matches a previously
    /// confirmed one and likely survived from an earlier version.
    CarriedOver,
    /// Unverifiable under randomization and not traceable to verified
    /// history.
    Dubious,
    /// Placeholder name, but the NID predates randomization; its real name
    /// may still be recoverable.
    UnknownPreserved,
    /// Placeholder name on a NID born under randomization; unrecoverable by
    /// hash-based methods.
    UnknownRandomized,
}

impl NidStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NidStatus::Known => "known",
            NidStatus::Unknown => "unknown",
            NidStatus::Mismatched => "mismatched",
            NidStatus::CarriedOver => "carried-over",
            NidStatus::Dubious => "dubious",
            NidStatus::UnknownPreserved => "unknown-preserved",
            NidStatus::UnknownRandomized => "unknown-randomized",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "known" => NidStatus::Known,
            "unknown" => NidStatus::Unknown,
            "mismatched" => NidStatus::Mismatched,
            "carried-over" => NidStatus::CarriedOver,
            "dubious" => NidStatus::Dubious,
            "unknown-preserved" => NidStatus::UnknownPreserved,
            "unknown-randomized" => NidStatus::UnknownRandomized,
            _ => return None,
        })
    }
}

/// Buckets for a version of a library that has never been randomized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlainBuckets {
    pub known: Vec<NidEntry>,
    pub unknown: Vec<NidEntry>,
    pub mismatched: Vec<NidEntry>,
}

/// Buckets for a version of a library whose NIDs have been randomized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomizedBuckets {
    pub known: Vec<NidEntry>,
    pub carried_over: Vec<NidEntry>,
    pub dubious: Vec<NidEntry>,
    pub unknown_preserved: Vec<NidEntry>,
    pub unknown_randomized: Vec<NidEntry>,
}

/// The disjoint, exhaustive partition of one version's entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VersionBuckets {
    Plain(PlainBuckets),
    Randomized(RandomizedBuckets),
}

impl VersionBuckets {
    /// Total number of entries across all buckets.
    pub fn total(&self) -> usize {
        self.statuses().iter().map(|(_, entries)| entries.len()).sum()
    }

    /// All buckets with their status labels, including empty ones.
    pub fn statuses(&self) -> Vec<(NidStatus, &[NidEntry])> {
        match self {
            VersionBuckets::Plain(b) => vec![
                (NidStatus::Known, b.known.as_slice()),
                (NidStatus::Unknown, b.unknown.as_slice()),
                (NidStatus::Mismatched, b.mismatched.as_slice()),
            ],
            VersionBuckets::Randomized(b) => vec![
                (NidStatus::Known, b.known.as_slice()),
                (NidStatus::CarriedOver, b.carried_over.as_slice()),
                (NidStatus::Dubious, b.dubious.as_slice()),
                (NidStatus::UnknownPreserved, b.unknown_preserved.as_slice()),
                (NidStatus::UnknownRandomized, b.unknown_randomized.as_slice()),
            ],
        }
    }
}

/// Classify one version's entries, updating the accumulated state.
///
/// Entries are first partitioned by name shape and hash: a placeholder name
/// is tentatively unknown (the shape check takes priority over hashing), a
/// hash-verifying name is known, anything else is mismatched. While the
/// library is not randomized, every entry is also recorded as a
/// pre-randomization sighting; that map is the canonical record of what each
/// NID's name was before any randomization.
///
/// For a randomized library the tentative buckets are refined, since hash
/// verification is meaningless there: mismatched names that match a
/// previously confirmed name are carried over, the rest are dubious;
/// placeholder NIDs seen before randomization keep a recoverable identity,
/// the rest were born under randomization.
///
/// Hash-verified entries are written back to the confirmed map only after
/// refinement, so refinement sees history up to the previous version.
pub fn classify_version(
    library: &str,
    version: &Version,
    entries: &[&NidEntry],
    state: &mut LibraryState,
    hasher: &dyn NidHasher,
    diagnostics: &mut Vec<Diagnostic>,
) -> VersionBuckets {
    let mut known: Vec<NidEntry> = Vec::new();
    let mut placeholder: Vec<NidEntry> = Vec::new();
    let mut mismatched: Vec<NidEntry> = Vec::new();

    for entry in entries {
        if !state.randomized {
            state.record_pre_randomization(entry.nid, version, &entry.name);
        }
        if nid::is_placeholder(&entry.name, entry.nid) {
            placeholder.push((*entry).clone());
        } else if nid::verify(hasher, &entry.name, entry.nid) {
            known.push((*entry).clone());
        } else {
            mismatched.push((*entry).clone());
        }
    }

    let buckets = if state.randomized {
        let mut carried_over = Vec::new();
        let mut dubious = Vec::new();
        for entry in mismatched {
            if state.confirmed.contains_key(&entry.nid)
                || state.pre_randomization.contains_key(&entry.nid)
            {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::IdCrossedRandomization,
                    library: library.to_string(),
                    version: version.clone(),
                    nid: entry.nid,
                    name: entry.name.clone(),
                    earlier: state
                        .confirmed
                        .get(&entry.nid)
                        .or_else(|| state.pre_randomization.get(&entry.nid))
                        .cloned(),
                });
            }
            if state.has_confirmed_name(&entry.name) {
                carried_over.push(entry);
            } else {
                dubious.push(entry);
            }
        }

        let mut unknown_preserved = Vec::new();
        let mut unknown_randomized = Vec::new();
        for entry in placeholder {
            if let Some(earlier) = state.confirmed.get(&entry.nid) {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::ConfirmedButUnknown,
                    library: library.to_string(),
                    version: version.clone(),
                    nid: entry.nid,
                    name: entry.name.clone(),
                    earlier: Some(earlier.clone()),
                });
            }
            if state.pre_randomization.contains_key(&entry.nid) {
                unknown_preserved.push(entry);
            } else {
                unknown_randomized.push(entry);
            }
        }

        VersionBuckets::Randomized(RandomizedBuckets {
            known,
            carried_over,
            dubious,
            unknown_preserved,
            unknown_randomized,
        })
    } else {
        // Safety check only: a NID that was once verified should not regress
        // to wrong or unknown in a later non-randomized version.
        for entry in mismatched.iter().chain(placeholder.iter()) {
            if let Some(earlier) = state.confirmed.get(&entry.nid) {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::ConfirmedRegressed,
                    library: library.to_string(),
                    version: version.clone(),
                    nid: entry.nid,
                    name: entry.name.clone(),
                    earlier: Some(earlier.clone()),
                });
            }
        }

        VersionBuckets::Plain(PlainBuckets { known, unknown: placeholder, mismatched })
    };

    let confirmed_now: Vec<(crate::nid::Nid, String)> = match &buckets {
        VersionBuckets::Plain(b) => b.known.iter().map(|e| (e.nid, e.name.clone())).collect(),
        VersionBuckets::Randomized(b) => b.known.iter().map(|e| (e.nid, e.name.clone())).collect(),
    };
    for (nid, name) in confirmed_now {
        state.record_confirmed(nid, version, &name);
    }

    buckets
}
