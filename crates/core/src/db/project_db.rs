use std::path::Path;
use std::str::FromStr;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::analysis::{Diagnostic, DiagnosticKind, Sighting};
use crate::db::{AnalysisRunRecord, LibraryRollup, RunStatus, VersionStatRecord};
use crate::model::Version;
use crate::nid::Nid;
use crate::report::ResolutionCount;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Error type for project database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed project database.
///
/// This is a thin wrapper around `rusqlite::Connection` that is responsible
/// for:
/// - Opening/creating the DB file.
/// - Applying schema migrations.
/// - Providing small, testable helpers for querying and updating records.
#[derive(Debug)]
pub struct ProjectDb {
    conn: Connection,
}

impl ProjectDb {
    /// Open (or create) a project database at the given path and ensure the
    /// schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    /// For most code, prefer higher-level helpers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert an analysis run record and return its row id.
    pub fn insert_run(&self, record: &AnalysisRunRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO analysis_runs (dataset_path, dataset_hash, status, started_at, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.dataset_path,
                record.dataset_hash,
                record.status.as_str(),
                record.started_at,
                record.finished_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update status (and optionally finished_at) for a run.
    ///
    /// Returns the number of rows affected.
    pub fn update_run_status(
        &self,
        run_id: i64,
        status: RunStatus,
        finished_at: Option<&str>,
    ) -> DbResult<usize> {
        let affected = if let Some(finish) = finished_at {
            self.conn.execute(
                "UPDATE analysis_runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
                params![status.as_str(), finish, run_id],
            )?
        } else {
            self.conn.execute(
                "UPDATE analysis_runs SET status = ?1 WHERE id = ?2",
                params![status.as_str(), run_id],
            )?
        };
        Ok(affected)
    }

    /// List all runs (ordered by id).
    pub fn list_runs(&self) -> DbResult<Vec<AnalysisRunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT dataset_path, dataset_hash, status, started_at, finished_at
            FROM analysis_runs
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AnalysisRunRecord {
                dataset_path: row.get(0)?,
                dataset_hash: row.get(1)?,
                status: {
                    let s: String = row.get(2)?;
                    s.parse::<RunStatusString>()?.0
                },
                started_at: row.get(3)?,
                finished_at: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Load the most recent run id, if any run exists.
    pub fn latest_run_id(&self) -> DbResult<Option<i64>> {
        let mut stmt =
            self.conn.prepare("SELECT id FROM analysis_runs ORDER BY id DESC LIMIT 1")?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// Persist per-version bucket counts for a run.
    pub fn insert_version_stats(
        &self,
        run_id: i64,
        stats: &[VersionStatRecord],
    ) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO version_stats
                    (run_id, library, version, status, count, randomized, randomized_here)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for stat in stats {
                stmt.execute(params![
                    run_id,
                    stat.library,
                    stat.version,
                    stat.status,
                    stat.count as i64,
                    if stat.randomized { 1 } else { 0 },
                    if stat.randomized_here { 1 } else { 0 }
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load persisted bucket counts for a run, optionally for one library.
    pub fn load_version_stats(
        &self,
        run_id: i64,
        library: Option<&str>,
    ) -> DbResult<Vec<VersionStatRecord>> {
        fn map_stat(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionStatRecord> {
            Ok(VersionStatRecord {
                library: row.get(0)?,
                version: row.get(1)?,
                status: row.get(2)?,
                count: row.get::<_, i64>(3)? as usize,
                randomized: row.get::<_, i64>(4)? != 0,
                randomized_here: row.get::<_, i64>(5)? != 0,
            })
        }

        let mut stmt = if library.is_some() {
            self.conn.prepare(
                r#"
                SELECT library, version, status, count, randomized, randomized_here
                FROM version_stats
                WHERE run_id = ?1 AND library = ?2
                ORDER BY library, version, status
                "#,
            )?
        } else {
            self.conn.prepare(
                r#"
                SELECT library, version, status, count, randomized, randomized_here
                FROM version_stats
                WHERE run_id = ?1
                ORDER BY library, version, status
                "#,
            )?
        };

        let rows = if let Some(lib) = library {
            stmt.query_map(params![run_id, lib], map_stat)?
        } else {
            stmt.query_map(params![run_id], map_stat)?
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Persist diagnostics collected during a run.
    pub fn insert_diagnostics(&self, run_id: i64, diagnostics: &[Diagnostic]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO diagnostics
                    (run_id, kind, library, version, nid, name, earlier_version, earlier_name)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for diag in diagnostics {
                stmt.execute(params![
                    run_id,
                    diag.kind.as_str(),
                    diag.library,
                    diag.version.as_str(),
                    diag.nid.hex(),
                    diag.name,
                    diag.earlier.as_ref().map(|s| s.version.as_str().to_string()),
                    diag.earlier.as_ref().map(|s| s.name.clone())
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load diagnostics persisted for a run.
    pub fn load_diagnostics(&self, run_id: i64) -> DbResult<Vec<Diagnostic>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT kind, library, version, nid, name, earlier_version, earlier_name
            FROM diagnostics
            WHERE run_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            let kind: String = row.get(0)?;
            let nid: String = row.get(3)?;
            let earlier_version: Option<String> = row.get(5)?;
            let earlier_name: Option<String> = row.get(6)?;
            Ok(Diagnostic {
                kind: kind.parse::<DiagnosticKindString>()?.0,
                library: row.get(1)?,
                version: Version::new(row.get::<_, String>(2)?),
                nid: Nid::from_str(&nid).map_err(|_| rusqlite::Error::InvalidQuery)?,
                name: row.get(4)?,
                earlier: match (earlier_version, earlier_name) {
                    (Some(v), Some(n)) => Some(Sighting { version: Version::new(v), name: n }),
                    _ => None,
                },
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert or replace a per-library rollup.
    pub fn upsert_library_rollup(&self, rollup: &LibraryRollup) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO libraries
                (name, randomized, plain_resolved, plain_total,
                 randomized_resolved, randomized_total, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                rollup.library,
                if rollup.randomized { 1 } else { 0 },
                rollup.plain.resolved as i64,
                rollup.plain.total as i64,
                rollup.randomized_pool.resolved as i64,
                rollup.randomized_pool.total as i64,
                rollup.updated_at
            ],
        )?;
        Ok(())
    }

    /// List all library rollups (ordered by name).
    pub fn list_library_rollups(&self) -> DbResult<Vec<LibraryRollup>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, randomized, plain_resolved, plain_total,
                   randomized_resolved, randomized_total, updated_at
            FROM libraries
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LibraryRollup {
                library: row.get(0)?,
                randomized: row.get::<_, i64>(1)? != 0,
                plain: ResolutionCount {
                    resolved: row.get::<_, i64>(2)? as usize,
                    total: row.get::<_, i64>(3)? as usize,
                },
                randomized_pool: ResolutionCount {
                    resolved: row.get::<_, i64>(4)? as usize,
                    total: row.get::<_, i64>(5)? as usize,
                },
                updated_at: row.get(6)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: analysis_runs table
/// - 2: version_stats and diagnostics tables
/// - 3: libraries rollup table
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS analysis_runs (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                dataset_path TEXT NOT NULL,
                dataset_hash TEXT,
                status       TEXT NOT NULL,
                started_at   TEXT NOT NULL,
                finished_at  TEXT NOT NULL
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS version_stats (
                run_id          INTEGER NOT NULL,
                library         TEXT NOT NULL,
                version         TEXT NOT NULL,
                status          TEXT NOT NULL,
                count           INTEGER NOT NULL,
                randomized      INTEGER NOT NULL DEFAULT 0,
                randomized_here INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY(run_id, library, version, status)
            );

            CREATE TABLE IF NOT EXISTS diagnostics (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id          INTEGER NOT NULL,
                kind            TEXT NOT NULL,
                library         TEXT NOT NULL,
                version         TEXT NOT NULL,
                nid             TEXT NOT NULL,
                name            TEXT NOT NULL,
                earlier_version TEXT,
                earlier_name    TEXT
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
        current_version = 2;
    }

    if current_version < 3 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS libraries (
                name                TEXT PRIMARY KEY,
                randomized          INTEGER NOT NULL DEFAULT 0,
                plain_resolved      INTEGER NOT NULL DEFAULT 0,
                plain_total         INTEGER NOT NULL DEFAULT 0,
                randomized_resolved INTEGER NOT NULL DEFAULT 0,
                randomized_total    INTEGER NOT NULL DEFAULT 0,
                updated_at          TEXT NOT NULL
            );

            PRAGMA user_version = 3;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

/// Helper for parsing status strings into RunStatus with better errors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunStatusString(pub RunStatus);

impl FromStr for RunStatusString {
    type Err = rusqlite::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunStatus::from_str_opt(s).map(RunStatusString).ok_or(rusqlite::Error::InvalidQuery)
    }
}

/// Helper for parsing diagnostic kind strings with better errors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiagnosticKindString(pub DiagnosticKind);

impl FromStr for DiagnosticKindString {
    type Err = rusqlite::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosticKind::from_str_opt(s)
            .map(DiagnosticKindString)
            .ok_or(rusqlite::Error::InvalidQuery)
    }
}
