//! Structured diagnostics emitted while classifying.
//!
//! These are side-channel signals that the heuristic's assumptions did not
//! perfectly hold for some entry. They never affect classification and never
//! abort a run; frontends print them to stderr and/or persist them for a
//! human to audit.

use serde::{Deserialize, Serialize};

use crate::analysis::state::Sighting;
use crate::model::Version;
use crate::nid::Nid;

/// Classification of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A NID whose name once hash-verified is now unknown or mismatched in a
    /// non-randomized version.
    ConfirmedRegressed,
    /// A mismatched NID in a randomized version was already seen confirmed
    /// or pre-randomization: an unexpected identifier collision across the
    /// randomization boundary.
    IdCrossedRandomization,
    /// A placeholder-named NID in a randomized version was previously
    /// confirmed, contradicting the unknown name.
    ConfirmedButUnknown,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::ConfirmedRegressed => "confirmed_regressed",
            DiagnosticKind::IdCrossedRandomization => "id_crossed_randomization",
            DiagnosticKind::ConfirmedButUnknown => "confirmed_but_unknown",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "confirmed_regressed" => Some(DiagnosticKind::ConfirmedRegressed),
            "id_crossed_randomization" => Some(DiagnosticKind::IdCrossedRandomization),
            "confirmed_but_unknown" => Some(DiagnosticKind::ConfirmedButUnknown),
            _ => None,
        }
    }
}

/// One diagnostic record tied to a specific entry at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub library: String,
    pub version: Version,
    pub nid: Nid,
    pub name: String,
    /// The earlier sighting that makes the current entry suspicious.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earlier: Option<Sighting>,
}
