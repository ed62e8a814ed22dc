//! Project layout, configuration, and database integration.
//!
//! A nidscope project is a directory with a `.nidscope` metadata dir holding
//! a JSON config and a SQLite database. The database records analysis runs,
//! per-version bucket statistics, diagnostics, and a per-library rollup so
//! status queries do not need to re-run the engine.

pub mod config;
pub mod context;
pub mod layout;
pub mod models;
pub mod project_db;
pub mod util;

pub use config::{DbConfig, ProjectConfig};
pub use context::ProjectContext;
pub use layout::ProjectLayout;
pub use models::{AnalysisRunRecord, LibraryRollup, RunStatus, VersionStatRecord};
pub use project_db::{DbError, DbResult, ProjectDb, CURRENT_SCHEMA_VERSION};
pub use util::{load_project_config, open_project_db};
