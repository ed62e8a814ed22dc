use serde::{Deserialize, Serialize};

use crate::report::ResolutionCount;

/// Allowed status values for analysis runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "succeeded" => Some(RunStatus::Succeeded),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Record describing one analysis run (bookkeeping, not results).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisRunRecord {
    /// Dataset path as given to the CLI.
    pub dataset_path: String,
    /// Optional SHA-256 of the dataset file, for identity.
    pub dataset_hash: Option<String>,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: String,
}

/// Per-(library, version, status) bucket count persisted with a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionStatRecord {
    pub library: String,
    pub version: String,
    /// Bucket label (`NidStatus::as_str`).
    pub status: String,
    pub count: usize,
    /// Sticky randomization state at this version.
    pub randomized: bool,
    /// Randomization event detected at the transition into this version.
    pub randomized_here: bool,
}

/// Per-library rollup kept up to date by analysis runs, so `status` queries
/// read it straight from the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryRollup {
    pub library: String,
    pub randomized: bool,
    pub plain: ResolutionCount,
    pub randomized_pool: ResolutionCount,
    pub updated_at: String,
}
