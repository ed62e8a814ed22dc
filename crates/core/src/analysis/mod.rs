//! The classification and randomization-detection engine.
//!
//! One library's history is a sequential fold: a [`state::LibraryState`]
//! threads through the version sequence, [`detect`] decides at each boundary
//! whether the identifier space was re-randomized, and [`classify`] buckets
//! each version's entries under the resulting mode. [`history`] ties the
//! pieces together and is the entry point frontends use.

pub mod classify;
pub mod detect;
pub mod diagnostics;
pub mod history;
pub mod state;

pub use classify::{classify_version, NidStatus, PlainBuckets, RandomizedBuckets, VersionBuckets};
pub use detect::{
    detect_randomization, detect_randomization_with_exceptions, TransitionException,
    CHURN_THRESHOLD, DETECTION_EXCEPTIONS,
};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use history::{analyze_all, analyze_library, LibraryHistory, VersionReport};
pub use state::{LibraryState, Sighting};
