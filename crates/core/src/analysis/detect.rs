//! Detection of NID-randomization events at version boundaries.

use std::collections::BTreeSet;

use crate::model::{NidEntry, Version};
use crate::nid::{self, Nid, NidHasher};

/// Churn above this fraction on both sides of a boundary is treated as a
/// randomization signature rather than ordinary API evolution. Strictly
/// greater-than: exactly 20% churn does not trigger.
pub const CHURN_THRESHOLD: f64 = 0.2;

/// A version boundary where the hash-verifying-newcomer disqualification
/// must not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionException {
    /// The earlier version of the boundary.
    pub source_version: &'static str,
    /// Why the disqualification is unreliable at this boundary.
    pub note: &'static str,
}

/// Boundaries exempt from the disqualification pass.
///
/// Firmware 5.55 shipped without a number of functions carried over from
/// 5.51; those symbols return in the following release and hash-verify even
/// when the rest of the identifier space was re-randomized, so a verified
/// newcomer out of 5.55 proves nothing.
pub const DETECTION_EXCEPTIONS: &[TransitionException] = &[TransitionException {
    source_version: "5.55",
    note: "5.55 misses functions from 5.51; they reappear verified in the next release",
}];

fn is_exempt(exceptions: &[TransitionException], from_version: &Version) -> bool {
    exceptions.iter().any(|e| e.source_version == from_version.as_str())
}

/// Decide whether a randomization event occurred between two consecutive
/// versions, given the earlier version's NID set and the later version's
/// entries.
///
/// A boundary is tentatively flagged when more than 20% of the later
/// version's NIDs are new and more than 20% of the earlier version's NIDs
/// vanished. The flag is then revoked if any newly appeared NID
/// hash-verifies against its own candidate name: a fresh, hash-consistent
/// name is strong evidence the naming scheme was not randomized here. The
/// exception table suppresses that revocation for the boundaries it lists.
///
/// An empty NID set on either side makes the ratios undefined; no detection
/// triggers. Note the inherent blind spot: a library randomized from its
/// very first tracked version has no prior baseline and is never flagged.
pub fn detect_randomization(
    prev_nids: &BTreeSet<Nid>,
    current_entries: &[&NidEntry],
    from_version: &Version,
    hasher: &dyn NidHasher,
) -> bool {
    detect_randomization_with_exceptions(
        prev_nids,
        current_entries,
        from_version,
        hasher,
        DETECTION_EXCEPTIONS,
    )
}

/// As [`detect_randomization`], with an explicit exception table.
pub fn detect_randomization_with_exceptions(
    prev_nids: &BTreeSet<Nid>,
    current_entries: &[&NidEntry],
    from_version: &Version,
    hasher: &dyn NidHasher,
    exceptions: &[TransitionException],
) -> bool {
    let current_nids: BTreeSet<Nid> = current_entries.iter().map(|e| e.nid).collect();
    if prev_nids.is_empty() || current_nids.is_empty() {
        return false;
    }

    let appeared: Vec<Nid> = current_nids.difference(prev_nids).copied().collect();
    let vanished = prev_nids.difference(&current_nids).count();

    let appear_ratio = appeared.len() as f64 / current_nids.len() as f64;
    let vanish_ratio = vanished as f64 / prev_nids.len() as f64;
    if appear_ratio <= CHURN_THRESHOLD || vanish_ratio <= CHURN_THRESHOLD {
        return false;
    }

    if is_exempt(exceptions, from_version) {
        return true;
    }

    let verified_newcomer = appeared.iter().any(|n| {
        current_entries
            .iter()
            .any(|e| e.nid == *n && nid::verify(hasher, &e.name, e.nid))
    });
    !verified_newcomer
}
