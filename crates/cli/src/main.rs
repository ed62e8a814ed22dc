use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use nidscope::{canonicalize_or_current, infer_project_name, sha256_file};
use nidscope_core::analysis::{self, LibraryHistory};
use nidscope_core::db::{
    AnalysisRunRecord, LibraryRollup, ProjectContext, RunStatus, VersionStatRecord,
};
use nidscope_core::loader::{self, exports, Dataset};
use nidscope_core::model::{NidEntry, Version};
use nidscope_core::nid::{NidHasher, Sha1Hasher};
use nidscope_core::report::{LibrarySummary, NidTimeline};

/// Firmware-history tracker for NID name resolution.
///
/// This CLI is a thin wrapper around `nidscope-core` (exposed in code as
/// `nidscope_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "nidscope",
    version,
    about = "Track NID name resolution and randomization across firmware history",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new nidscope project at the given root.
    ///
    /// This will:
    /// - Create a `.nidscope` metadata directory.
    /// - Create `datasets` and `reports` directories.
    /// - Write a `.nidscope/project.json` config file.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show basic information about an existing nidscope project.
    ///
    /// This reads `.nidscope/project.json` and reports key paths and config values.
    ProjectInfo {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,
    },

    /// Compute the NID for one or more symbol names.
    ComputeNid {
        /// Symbol names to hash.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run the classification engine over a dataset and persist the results.
    ///
    /// Classifies every library's entries version by version, detects
    /// randomization events, stores per-version statistics and diagnostics
    /// in the project database, and writes per-library report files.
    Analyze {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Dataset file (.json/.yaml). Defaults to the project config's default dataset.
        #[arg(long)]
        file: Option<String>,

        /// Restrict the run to a single library.
        #[arg(long)]
        library: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Skip writing per-library report files.
        #[arg(long, default_value_t = false)]
        no_reports: bool,

        /// Skip dataset hash computation (stores no hash with the run).
        #[arg(long, default_value_t = false)]
        skip_hash: bool,
    },

    /// Show the per-library rollup from the latest analysis runs.
    ///
    /// Reads the project database; run `analyze` first.
    Status {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the per-NID timeline for one library of a dataset.
    Timeline {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Dataset file (.json/.yaml). Defaults to the project config's default dataset.
        #[arg(long)]
        file: Option<String>,

        /// Library to show.
        #[arg(long)]
        library: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Convert PSP export source files into a dataset document.
    ///
    /// Export files carry no firmware versions, so every parsed entry is
    /// tagged with the version given here.
    ConvertExport {
        /// Export source files to parse.
        #[arg(long, required = true, num_args = 1..)]
        file: Vec<String>,

        /// Firmware version to tag the parsed entries with.
        #[arg(long)]
        version: String,

        /// Output dataset path. Defaults to stdout.
        #[arg(long)]
        out: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            println!("nidscope v{}", nidscope_core::version());
            println!("Run with --help to list commands.");
            Ok(())
        }
        Some(Command::InitProject { root, name }) => init_project_command(&root, name),
        Some(Command::ProjectInfo { root }) => project_info_command(&root),
        Some(Command::ComputeNid { names }) => compute_nid_command(&names),
        Some(Command::Analyze { root, file, library, json, no_reports, skip_hash }) => {
            analyze_command(&root, file, library.as_deref(), json, no_reports, skip_hash)
        }
        Some(Command::Status { root, json }) => status_command(&root, json),
        Some(Command::Timeline { root, file, library, json }) => {
            timeline_command(&root, file, &library, json)
        }
        Some(Command::ConvertExport { file, version, out }) => {
            convert_export_command(&file, &version, out.as_deref())
        }
    }
}

/// Initialize a new project at `root`.
fn init_project_command(root: &str, name: Option<String>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = nidscope_core::db::ProjectLayout::new(&root_path);

    // Derive project name if not provided.
    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&root_path),
    };

    // Ensure directories exist.
    fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    fs::create_dir_all(&layout.datasets_dir).with_context(|| {
        format!("Failed to create datasets dir: {}", layout.datasets_dir.display())
    })?;
    fs::create_dir_all(&layout.reports_dir).with_context(|| {
        format!("Failed to create reports dir: {}", layout.reports_dir.display())
    })?;

    // Build project config.
    let db_path_rel = layout.db_path_relative_string();
    let config = nidscope_core::db::ProjectConfig::new(&project_name, db_path_rel);

    // Serialize and write config JSON.
    let json = serde_json::to_string_pretty(&config)?;
    fs::write(&layout.project_config_path, json).with_context(|| {
        format!("Failed to write project config: {}", layout.project_config_path.display())
    })?;

    // Create the project database immediately so follow-on commands (and
    // tests) can rely on its presence.
    nidscope_core::db::ProjectDb::open(&layout.db_path).with_context(|| {
        format!("Failed to initialize project database at {}", layout.db_path.display())
    })?;

    println!("Initialized nidscope project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  DB path (relative): {}", config.db.path);
    println!("  Datasets dir: {}", layout.datasets_dir.display());
    println!("  Reports dir: {}", layout.reports_dir.display());

    Ok(())
}

/// Show basic information about an existing project.
fn project_info_command(root: &str) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = nidscope_core::db::ProjectLayout::new(&root_path);
    let config = nidscope_core::db::load_project_config(&layout)?;

    println!("nidscope Project Info");
    println!("=====================");
    println!("Name: {}", config.name);
    println!("Root: {}", layout.root.display());
    println!("Config file: {}", layout.project_config_path.display());
    println!("Config version: {}", config.config_version);
    println!("DB path (config): {}", config.db.path);
    if let Some(dataset) = &config.default_dataset {
        println!("Default dataset: {}", dataset);
    }
    println!();

    // Basic directory existence checks.
    println!("Directories:");
    print_dir_status("Meta dir (.nidscope)", &layout.meta_dir);
    print_dir_status("Datasets dir", &layout.datasets_dir);
    print_dir_status("Reports dir", &layout.reports_dir);

    Ok(())
}

/// Hash symbol names into NIDs.
fn compute_nid_command(names: &[String]) -> Result<()> {
    let hasher = Sha1Hasher;
    for name in names {
        println!("{}  {}", hasher.compute(name), name);
    }
    Ok(())
}

/// Per-library report file content: summary plus timeline.
#[derive(Debug, Serialize)]
struct LibraryReport<'a> {
    summary: &'a LibrarySummary,
    timeline: NidTimeline,
}

/// Run the engine over a dataset, persist results, and print summaries.
fn analyze_command(
    root: &str,
    file: Option<String>,
    library: Option<&str>,
    json: bool,
    no_reports: bool,
    skip_hash: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;

    let (dataset_arg, dataset_path) = resolve_dataset(&ctx, file)?;
    let entries = load_dataset_entries(&dataset_path, library)?;

    let dataset_hash = if skip_hash { None } else { Some(sha256_file(&dataset_path)?) };
    let started_at = Utc::now().to_rfc3339();
    let run_id = ctx
        .db
        .insert_run(&AnalysisRunRecord {
            dataset_path: dataset_arg,
            dataset_hash,
            status: RunStatus::Running,
            started_at: started_at.clone(),
            finished_at: started_at,
        })
        .context("Failed to insert analysis run record")?;

    let hasher = Sha1Hasher;
    let histories = analysis::analyze_all(&entries, &hasher);

    let updated_at = Utc::now().to_rfc3339();
    let mut summaries = Vec::with_capacity(histories.len());
    for history in &histories {
        let summary = LibrarySummary::from_history(history);
        persist_history(&ctx, run_id, history, &summary, &updated_at)?;
        for diag in &history.diagnostics {
            print_diagnostic(diag);
        }

        if !no_reports {
            write_library_report(&ctx, history, &summary)?;
        }
        summaries.push(summary);
    }

    let finished_at = Utc::now().to_rfc3339();
    ctx.db
        .update_run_status(run_id, RunStatus::Succeeded, Some(&finished_at))
        .context("Failed to update analysis run status")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        println!("Analyzed {} libraries ({} entries):", summaries.len(), entries.len());
        for summary in &summaries {
            let marker = if summary.randomized { " *" } else { "" };
            println!("  - {} [{}]{}", summary.library, summary.progress(), marker);
        }
        if summaries.iter().any(|s| s.randomized) {
            println!("(* = NIDs randomized at some version)");
        }
    }

    Ok(())
}

/// Show the per-library rollup recorded by previous analyze runs.
fn status_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;

    let rollups = ctx.db.list_library_rollups().context("Failed to list library rollups")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rollups)?);
        return Ok(());
    }

    println!("Libraries ({}):", rollups.len());
    if rollups.is_empty() {
        println!("  (none; run `nidscope analyze` first)");
        return Ok(());
    }
    for rollup in rollups {
        let mut parts = Vec::new();
        if let Some(p) = rollup.plain.display() {
            parts.push(p);
        }
        if let Some(p) = rollup.randomized_pool.display() {
            parts.push(p);
        }
        let marker = if rollup.randomized { " *" } else { "" };
        println!("  - {} [{}]{}", rollup.library, parts.join(" / "), marker);
    }

    Ok(())
}

/// Print the per-NID timeline for one library.
fn timeline_command(root: &str, file: Option<String>, library: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;

    let (_, dataset_path) = resolve_dataset(&ctx, file)?;
    let entries = load_dataset_entries(&dataset_path, Some(library))?;

    let hasher = Sha1Hasher;
    let group: Vec<&NidEntry> = entries.iter().collect();
    let history = analysis::analyze_library(library, &group, &hasher);
    let timeline = NidTimeline::from_history(&history);

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    println!("Timeline for {} ({} NIDs, {} versions):", library, timeline.rows.len(), timeline.versions.len());
    for row in &timeline.rows {
        println!("{}", row.nid);
        for version in &timeline.versions {
            if let Some(cell) = row.cells.get(version) {
                let source = match &cell.source {
                    Some(s) => format!(" (source: {s})"),
                    None => String::new(),
                };
                println!("  {}: {} [{}]{}", version, cell.name, cell.status.as_str(), source);
            }
        }
    }

    Ok(())
}

/// Convert export source files into a dataset document.
fn convert_export_command(files: &[String], version: &str, out: Option<&str>) -> Result<()> {
    let hasher = Sha1Hasher;
    let mut entries = Vec::new();
    for file in files {
        let path = Path::new(file);
        let parsed = exports::load_export_file(path, &hasher)
            .with_context(|| format!("Failed to parse export file {}", path.display()))?;
        entries.extend(parsed);
    }

    for entry in &mut entries {
        entry.versions.insert(Version::new(version));
    }

    let dataset = Dataset { entries };
    dataset.validate().context("Export files produced malformed entries")?;
    let json = serde_json::to_string_pretty(&dataset)?;

    match out {
        Some(out_path) => {
            fs::write(out_path, json)
                .with_context(|| format!("Failed to write dataset to {out_path}"))?;
            println!("Wrote {} entries to {}", dataset.entries.len(), out_path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Resolve the dataset path from the CLI argument or the project config.
fn resolve_dataset(ctx: &ProjectContext, file: Option<String>) -> Result<(String, PathBuf)> {
    let dataset_arg = match file.or_else(|| ctx.config.default_dataset.clone()) {
        Some(f) => f,
        None => {
            return Err(anyhow!(
                "No dataset given (use --file) and no default dataset in project config"
            ))
        }
    };
    let path = Path::new(&dataset_arg);
    let dataset_path =
        if path.is_absolute() { path.to_path_buf() } else { ctx.layout.root.join(path) };
    if !dataset_path.is_file() {
        return Err(anyhow!("Dataset file does not exist: {}", dataset_path.display()));
    }
    Ok((dataset_arg, dataset_path))
}

/// Load dataset entries, optionally restricted to one library.
fn load_dataset_entries(dataset_path: &Path, library: Option<&str>) -> Result<Vec<NidEntry>> {
    let entries = loader::load_entries(dataset_path)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;
    let entries: Vec<NidEntry> = match library {
        Some(lib) => entries.into_iter().filter(|e| e.library == lib).collect(),
        None => entries,
    };
    if entries.is_empty() {
        return Err(anyhow!(match library {
            Some(lib) => format!("Dataset has no entries for library '{lib}'"),
            None => "Dataset has no entries with versions".to_string(),
        }));
    }
    Ok(entries)
}

/// Persist one library's history (stats + diagnostics + rollup) for a run.
fn persist_history(
    ctx: &ProjectContext,
    run_id: i64,
    history: &LibraryHistory,
    summary: &LibrarySummary,
    updated_at: &str,
) -> Result<()> {
    let mut stats = Vec::new();
    for report in &history.versions {
        for (status, bucket) in report.buckets.statuses() {
            if bucket.is_empty() {
                continue;
            }
            stats.push(VersionStatRecord {
                library: history.library.clone(),
                version: report.version.as_str().to_string(),
                status: status.as_str().to_string(),
                count: bucket.len(),
                randomized: report.randomized,
                randomized_here: report.randomized_here,
            });
        }
    }
    ctx.db
        .insert_version_stats(run_id, &stats)
        .with_context(|| format!("Failed to store stats for {}", history.library))?;
    ctx.db
        .insert_diagnostics(run_id, &history.diagnostics)
        .with_context(|| format!("Failed to store diagnostics for {}", history.library))?;

    ctx.db
        .upsert_library_rollup(&LibraryRollup {
            library: summary.library.clone(),
            randomized: summary.randomized,
            plain: summary.plain,
            randomized_pool: summary.randomized_pool,
            updated_at: updated_at.to_string(),
        })
        .with_context(|| format!("Failed to store rollup for {}", history.library))?;

    Ok(())
}

/// Write the per-library report file (summary + timeline).
fn write_library_report(
    ctx: &ProjectContext,
    history: &LibraryHistory,
    summary: &LibrarySummary,
) -> Result<()> {
    fs::create_dir_all(&ctx.layout.reports_dir).with_context(|| {
        format!("Failed to create reports dir {}", ctx.layout.reports_dir.display())
    })?;
    let report = LibraryReport { summary, timeline: NidTimeline::from_history(history) };
    let path = ctx.layout.library_report_path(&history.library);
    fs::write(&path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    Ok(())
}

/// Diagnostics go to stderr; they are audit signals, not results.
fn print_diagnostic(diag: &nidscope_core::analysis::Diagnostic) {
    let earlier = match &diag.earlier {
        Some(s) => format!(" (earlier: {} in {})", s.name, s.version),
        None => String::new(),
    };
    eprintln!(
        "WARN [{}] {} {} {} {}{}",
        diag.kind.as_str(),
        diag.library,
        diag.version,
        diag.nid,
        diag.name,
        earlier
    );
}

/// Helper to print whether a directory exists.
fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}
