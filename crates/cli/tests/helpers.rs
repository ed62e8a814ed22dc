use std::fs;
use std::path::Path;

use nidscope::{canonicalize_or_current, infer_project_name, sha256_file};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_resolves_existing_path() {
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");

    let result = canonicalize_or_current(subdir.to_str().expect("utf8 path"))
        .expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));
}

#[test]
fn canonicalize_or_current_keeps_missing_paths_absolute() {
    let result = canonicalize_or_current("does-not-exist-anywhere").expect("fallback");
    assert!(result.is_absolute());
    assert!(result.ends_with("does-not-exist-anywhere"));
}

#[test]
fn infer_project_name_uses_last_path_component() {
    assert_eq!(infer_project_name(Path::new("/tmp/psp-nids")), "psp-nids");
    assert_eq!(infer_project_name(Path::new("/")), "unnamed-project");
}

#[test]
fn sha256_file_matches_reference_vector() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("dataset.bin");
    fs::write(&path, b"hello").expect("write file");

    let digest = sha256_file(&path).expect("hash file");
    assert_eq!(digest, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
}

#[test]
fn sha256_file_fails_for_missing_file() {
    let tmp = tempdir().expect("tempdir");
    assert!(sha256_file(&tmp.path().join("missing.bin")).is_err());
}
