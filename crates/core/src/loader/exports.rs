//! Parser for the PSP export source format.
//!
//! An export file declares one library per `PSP_EXPORT_START(name, unk,
//! flags)` / `PSP_EXPORT_END` block. Functions appear either with an
//! explicit NID (`PSP_EXPORT_FUNC_NID(name, 0xNID)`) or by name only
//! (`PSP_EXPORT_FUNC_HASH(name)`), in which case the NID is derived with the
//! hash primitive.
//!
//! Parsed entries carry no firmware versions; export files describe a single
//! firmware, so the caller tags every entry with the version it is importing.

use std::path::Path;

use crate::loader::{LoadError, LoadResult};
use crate::model::NidEntry;
use crate::nid::NidHasher;

fn paren_args(line: &str, lineno: usize) -> LoadResult<&str> {
    let open = line.find('(');
    let close = line.find(')');
    match (open, close) {
        (Some(o), Some(c)) if o < c => Ok(&line[o + 1..c]),
        _ => Err(LoadError::ExportSyntax {
            line: lineno,
            reason: "expected parenthesized arguments".to_string(),
        }),
    }
}

/// Parse export source text into version-less entries.
pub fn parse_export_source(source: &str, hasher: &dyn NidHasher) -> LoadResult<Vec<NidEntry>> {
    let mut entries = Vec::new();
    let mut library: Option<String> = None;

    for (idx, line) in source.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.trim_start();

        if line.starts_with("PSP_EXPORT_START") {
            let args = paren_args(line, lineno)?;
            let mut parts = args.split(',');
            let name = parts.next().map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(LoadError::ExportSyntax {
                    line: lineno,
                    reason: "PSP_EXPORT_START with empty library name".to_string(),
                });
            }
            library = Some(name.to_string());
        } else if line.starts_with("PSP_EXPORT_FUNC_NID") {
            let lib = library.clone().ok_or_else(|| LoadError::ExportSyntax {
                line: lineno,
                reason: "function outside PSP_EXPORT_START block".to_string(),
            })?;
            let args = paren_args(line, lineno)?;
            let (name, nid_str) =
                args.split_once(',').ok_or_else(|| LoadError::ExportSyntax {
                    line: lineno,
                    reason: "expected 'name, nid' arguments".to_string(),
                })?;
            let nid = nid_str.trim().parse().map_err(|_| LoadError::ExportSyntax {
                line: lineno,
                reason: format!("invalid NID '{}'", nid_str.trim()),
            })?;
            entries.push(NidEntry::new(nid, name.trim(), lib));
        } else if line.starts_with("PSP_EXPORT_FUNC_HASH") {
            let lib = library.clone().ok_or_else(|| LoadError::ExportSyntax {
                line: lineno,
                reason: "function outside PSP_EXPORT_START block".to_string(),
            })?;
            let name = paren_args(line, lineno)?.trim();
            if name.is_empty() {
                return Err(LoadError::ExportSyntax {
                    line: lineno,
                    reason: "PSP_EXPORT_FUNC_HASH with empty name".to_string(),
                });
            }
            entries.push(NidEntry::new(hasher.compute(name), name, lib));
        } else if line.starts_with("PSP_EXPORT_END") {
            library = None;
        }
    }

    Ok(entries)
}

/// Read and parse an export file from disk.
pub fn load_export_file(path: &Path, hasher: &dyn NidHasher) -> LoadResult<Vec<NidEntry>> {
    let source = std::fs::read_to_string(path)?;
    parse_export_source(&source, hasher)
}
