//! Consumer-facing views derived from a library's classification history.
//!
//! Two shapes are produced: a per-library resolution summary (how much of
//! the identifier space has a usable name) and a per-NID timeline (what each
//! NID was called, with what status, at every version). Both are plain serde
//! data; rendering is left to frontends.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analysis::{LibraryHistory, NidStatus};
use crate::model::Version;
use crate::nid::Nid;

/// Resolved-over-total counter for one pool of NIDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionCount {
    pub resolved: usize,
    pub total: usize,
}

impl ResolutionCount {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Percentage resolved, or `None` for an empty pool.
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.resolved as f64 / self.total as f64 * 100.0)
        }
    }

    /// Compact `83.3% (5/6)` form, or `None` for an empty pool.
    pub fn display(&self) -> Option<String> {
        self.percent().map(|p| format!("{:.1}% ({}/{})", p, self.resolved, self.total))
    }
}

/// Whole-history resolution summary for one library.
///
/// Every NID is counted once, under the status of its latest appearance.
/// The non-randomized pool counts hash-verified names as resolved; in the
/// randomized pool every specified name is counted as resolved, since names
/// there cannot be verified at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub library: String,
    /// Resolution among NIDs classified under the non-randomized buckets.
    pub plain: ResolutionCount,
    /// Resolution among NIDs classified under the randomized buckets.
    pub randomized_pool: ResolutionCount,
    /// Sticky randomization flag after the last version.
    pub randomized: bool,
    /// Versions at whose boundary a randomization event was detected.
    pub randomized_at: Vec<Version>,
}

impl LibrarySummary {
    pub fn from_history(history: &LibraryHistory) -> Self {
        let mut final_status: BTreeMap<Nid, NidStatus> = BTreeMap::new();
        for report in &history.versions {
            for (status, entries) in report.buckets.statuses() {
                for entry in entries {
                    final_status.insert(entry.nid, status);
                }
            }
        }

        let mut plain = ResolutionCount::default();
        let mut randomized_pool = ResolutionCount::default();
        for status in final_status.values() {
            match status {
                NidStatus::Known => {
                    plain.resolved += 1;
                    plain.total += 1;
                }
                NidStatus::Unknown | NidStatus::Mismatched | NidStatus::UnknownPreserved => {
                    plain.total += 1;
                }
                NidStatus::CarriedOver | NidStatus::Dubious => {
                    randomized_pool.resolved += 1;
                    randomized_pool.total += 1;
                }
                NidStatus::UnknownRandomized => {
                    randomized_pool.total += 1;
                }
            }
        }

        let randomized_at = history
            .versions
            .iter()
            .filter(|r| r.randomized_here)
            .map(|r| r.version.clone())
            .collect();

        Self {
            library: history.library.clone(),
            plain,
            randomized_pool,
            randomized: history.finally_randomized(),
            randomized_at,
        }
    }

    /// Aggregate progress string covering both pools, e.g.
    /// `83.3% (5/6) / 40.0% (2/5)`.
    pub fn progress(&self) -> String {
        let parts: Vec<String> = [self.plain.display(), self.randomized_pool.display()]
            .into_iter()
            .flatten()
            .collect();
        parts.join(" / ")
    }
}

/// One NID's classification at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineCell {
    pub status: NidStatus,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One NID's row across the version sequence. Versions where the NID was
/// absent have no cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    pub nid: Nid,
    pub cells: BTreeMap<Version, TimelineCell>,
}

/// Per-NID view of a library's history, for timeline rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NidTimeline {
    pub library: String,
    pub versions: Vec<Version>,
    pub rows: Vec<TimelineRow>,
}

impl NidTimeline {
    /// Build the per-NID view from a history.
    ///
    /// Rows are ordered by the first version each NID appears in, then by
    /// the name it carries there, so related symbols cluster together.
    pub fn from_history(history: &LibraryHistory) -> Self {
        let mut cells: BTreeMap<Nid, BTreeMap<Version, TimelineCell>> = BTreeMap::new();
        for report in &history.versions {
            for (status, entries) in report.buckets.statuses() {
                for entry in entries {
                    cells.entry(entry.nid).or_default().insert(
                        report.version.clone(),
                        TimelineCell {
                            status,
                            name: entry.name.clone(),
                            source: entry.source.clone(),
                        },
                    );
                }
            }
        }

        let versions: Vec<Version> = history.versions.iter().map(|r| r.version.clone()).collect();

        let mut order: Vec<Nid> = Vec::with_capacity(cells.len());
        let mut seen: BTreeSet<Nid> = BTreeSet::new();
        for version in &versions {
            let mut at_version: Vec<(&str, Nid)> = cells
                .iter()
                .filter_map(|(nid, row)| row.get(version).map(|c| (c.name.as_str(), *nid)))
                .collect();
            at_version.sort();
            for (_, nid) in at_version {
                if seen.insert(nid) {
                    order.push(nid);
                }
            }
        }

        let rows = order
            .into_iter()
            .map(|nid| {
                let cells = cells.get(&nid).cloned().unwrap_or_default();
                TimelineRow { nid, cells }
            })
            .collect();

        Self { library: history.library.clone(), versions, rows }
    }
}
