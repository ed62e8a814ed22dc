//! Dataset loading.
//!
//! The engine itself consumes typed [`NidEntry`] values; this module is the
//! boundary where external record formats become those values. Two formats
//! are supported: a serde dataset document (JSON or YAML, picked by file
//! extension) and the PSP export text format (see [`exports`]).

pub mod exports;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::NidEntry;

/// A dataset document: the deduplicated entries for any number of libraries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub entries: Vec<NidEntry>,
}

/// Error type for dataset and export-file loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported dataset extension for '{path}' (expected .json, .yaml or .yml)")]
    UnsupportedExtension { path: String },

    #[error("Malformed entry for NID {nid}: {reason}")]
    MalformedEntry { nid: String, reason: String },

    #[error("Export file syntax error on line {line}: {reason}")]
    ExportSyntax { line: usize, reason: String },
}

/// Convenience result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

impl Dataset {
    /// Reject entries the core must never see: missing names or library
    /// names. Entries with an empty version set are not an error here; they
    /// are dropped by [`Dataset::into_entries`] since they cannot appear at
    /// any version.
    pub fn validate(&self) -> LoadResult<()> {
        for entry in &self.entries {
            if entry.name.trim().is_empty() {
                return Err(LoadError::MalformedEntry {
                    nid: entry.nid.hex(),
                    reason: "empty name".to_string(),
                });
            }
            if entry.library.trim().is_empty() {
                return Err(LoadError::MalformedEntry {
                    nid: entry.nid.hex(),
                    reason: "empty library name".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validated entries, with version-less entries dropped.
    pub fn into_entries(self) -> LoadResult<Vec<NidEntry>> {
        self.validate()?;
        Ok(self.entries.into_iter().filter(|e| !e.versions.is_empty()).collect())
    }
}

/// Load a dataset document from disk, picking the parser by extension.
pub fn load_dataset(path: &Path) -> LoadResult<Dataset> {
    let bytes = std::fs::read(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_slice(&bytes)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_slice(&bytes)?),
        _ => Err(LoadError::UnsupportedExtension { path: path.display().to_string() }),
    }
}

/// Load a dataset and return its validated entries.
pub fn load_entries(path: &Path) -> LoadResult<Vec<NidEntry>> {
    load_dataset(path)?.into_entries()
}
