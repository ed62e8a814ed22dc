//! nidscope-core
//!
//! Core library for tracking, across an ordered sequence of firmware
//! releases, whether the symbolic name attached to each exported NID can be
//! verified against its hash, and for detecting when a library's identifier
//! space has been deliberately re-randomized.
//!
//! This crate defines the data model, the hashing/verification primitives,
//! the per-version classification and randomization-detection engine, report
//! aggregation, dataset loaders, and project database integration.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, report generators, etc.).

pub mod analysis;
pub mod db;
pub mod loader;
pub mod model;
pub mod nid;
pub mod report;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
