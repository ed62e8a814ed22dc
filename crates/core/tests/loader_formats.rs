use std::fs;

use nidscope_core::loader::{self, exports, Dataset, LoadError};
use nidscope_core::model::{NidEntry, Version};
use nidscope_core::nid::{Nid, Sha1Hasher};
use tempfile::tempdir;

fn sample_dataset() -> Dataset {
    Dataset {
        entries: vec![
            NidEntry::new(Nid(0x109F_50BC), "sceIoOpen", "IoFileMgrForUser")
                .with_versions(["1.50", "2.00"]),
            NidEntry::new(Nid(0xDEAD_BEEF), "IoFileMgrForUser_DEADBEEF", "IoFileMgrForUser")
                .with_versions(["2.00"])
                .with_source("stub"),
        ],
    }
}

#[test]
fn json_dataset_round_trips() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("dataset.json");
    let dataset = sample_dataset();
    fs::write(&path, serde_json::to_string_pretty(&dataset).expect("serialize"))
        .expect("write dataset");

    let entries = loader::load_entries(&path).expect("load");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].nid, Nid(0x109F_50BC));
    assert_eq!(entries[0].name, "sceIoOpen");
    assert!(entries[0].versions.contains(&Version::new("1.50")));
    assert_eq!(entries[1].source.as_deref(), Some("stub"));
}

#[test]
fn yaml_dataset_parses_by_extension() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("dataset.yaml");
    let yaml = r#"
entries:
  - nid: "109F50BC"
    name: sceIoOpen
    library: IoFileMgrForUser
    versions: ["1.50"]
"#;
    fs::write(&path, yaml).expect("write dataset");

    let entries = loader::load_entries(&path).expect("load");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].nid, Nid(0x109F_50BC));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("dataset.xml");
    fs::write(&path, "<entries/>").expect("write file");

    match loader::load_dataset(&path) {
        Err(LoadError::UnsupportedExtension { .. }) => {}
        other => panic!("expected UnsupportedExtension, got {other:?}"),
    }
}

#[test]
fn entries_without_versions_are_dropped() {
    let mut dataset = sample_dataset();
    dataset.entries.push(NidEntry::new(Nid(0x1), "orphan_fn", "IoFileMgrForUser"));

    let entries = dataset.into_entries().expect("validate");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| !e.versions.is_empty()));
}

#[test]
fn malformed_entries_fail_validation() {
    let mut dataset = sample_dataset();
    dataset.entries.push(NidEntry::new(Nid(0x2), "  ", "IoFileMgrForUser"));
    match dataset.validate() {
        Err(LoadError::MalformedEntry { reason, .. }) => assert_eq!(reason, "empty name"),
        other => panic!("expected MalformedEntry, got {other:?}"),
    }

    let mut dataset = sample_dataset();
    dataset.entries.push(NidEntry::new(Nid(0x3), "some_fn", ""));
    match dataset.validate() {
        Err(LoadError::MalformedEntry { reason, .. }) => {
            assert_eq!(reason, "empty library name");
        }
        other => panic!("expected MalformedEntry, got {other:?}"),
    }
}

const EXPORT_SOURCE: &str = r#"
PSP_EXPORT_START(IoFileMgrForUser, 0, 0x4001)
PSP_EXPORT_FUNC_NID(sceIoClose, 0x810C4BC3)
PSP_EXPORT_FUNC_HASH(sceIoOpen)
PSP_EXPORT_END
PSP_EXPORT_START(StdioForUser, 0, 0x4001)
PSP_EXPORT_FUNC_NID(sceKernelStdin, 0x172D316E)
PSP_EXPORT_END
"#;

#[test]
fn export_source_parses_blocks_and_derives_hash_nids() {
    let entries =
        exports::parse_export_source(EXPORT_SOURCE, &Sha1Hasher).expect("parse exports");
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].library, "IoFileMgrForUser");
    assert_eq!(entries[0].name, "sceIoClose");
    assert_eq!(entries[0].nid, Nid(0x810C_4BC3));

    // FUNC_HASH derives the NID from the name.
    assert_eq!(entries[1].name, "sceIoOpen");
    assert_eq!(entries[1].nid, Nid(0x109F_50BC));

    assert_eq!(entries[2].library, "StdioForUser");

    // Export files carry no firmware versions.
    assert!(entries.iter().all(|e| e.versions.is_empty()));
}

#[test]
fn export_function_outside_block_is_an_error() {
    let source = "PSP_EXPORT_FUNC_NID(sceIoClose, 0x810C4BC3)\n";
    match exports::parse_export_source(source, &Sha1Hasher) {
        Err(LoadError::ExportSyntax { line: 1, .. }) => {}
        other => panic!("expected ExportSyntax on line 1, got {other:?}"),
    }
}

#[test]
fn export_bad_nid_is_an_error() {
    let source = "PSP_EXPORT_START(Lib, 0, 0)\nPSP_EXPORT_FUNC_NID(fn, 0xZZZ)\n";
    match exports::parse_export_source(source, &Sha1Hasher) {
        Err(LoadError::ExportSyntax { line: 2, reason }) => {
            assert!(reason.contains("invalid NID"), "reason: {reason}");
        }
        other => panic!("expected ExportSyntax on line 2, got {other:?}"),
    }
}

#[test]
fn export_file_loads_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("io.exp");
    fs::write(&path, EXPORT_SOURCE).expect("write exports");

    let entries = exports::load_export_file(&path, &Sha1Hasher).expect("load exports");
    assert_eq!(entries.len(), 3);
}
