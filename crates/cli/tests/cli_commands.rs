use nidscope_core::db::ProjectLayout;
use predicates::prelude::*;
use tempfile::tempdir;

/// Running the CLI with no arguments should print version info and succeed.
#[test]
fn no_command_prints_version_info() {
    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .assert()
        .success()
        .stdout(predicate::str::contains("nidscope v"));
}

/// init-project without an explicit --root should use the current directory
/// as the project root and write the config file.
#[test]
fn init_project_uses_default_root_when_not_provided() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(root)
        .arg("init-project")
        .arg("--name")
        .arg("TestProject")
        .assert()
        .success();

    let layout = ProjectLayout::new(root);
    assert!(
        layout.project_config_path.exists(),
        "project config should exist at {}",
        layout.project_config_path.display()
    );
    assert!(layout.db_path.exists(), "project db should be created eagerly");
    assert!(layout.datasets_dir.is_dir());
    assert!(layout.reports_dir.is_dir());
}

/// init-project derives the project name from the root directory when no
/// --name is given.
#[test]
fn init_project_derives_name_from_root() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("my-firmware-audit");
    std::fs::create_dir_all(&root).expect("create root");

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .arg("init-project")
        .arg("--root")
        .arg(root.to_str().expect("utf8 root"))
        .assert()
        .success()
        .stdout(predicate::str::contains("my-firmware-audit"));
}

/// project-info should fail (non-zero exit) if no project config exists.
#[test]
fn project_info_fails_when_config_missing() {
    let dir = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("project-info")
        .assert()
        .failure();
}

/// project-info reports the configured name and directory status after init.
#[test]
fn project_info_reports_initialized_project() {
    let dir = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("init-project")
        .arg("--name")
        .arg("InfoProject")
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("project-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("InfoProject"))
        .stdout(predicate::str::contains("Datasets dir"));
}

/// compute-nid hashes names with the reference derivation.
#[test]
fn compute_nid_prints_reference_vectors() {
    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .arg("compute-nid")
        .arg("sceIoOpen")
        .arg("sceKernelCreateThread")
        .assert()
        .success()
        .stdout(predicate::str::contains("109F50BC  sceIoOpen"))
        .stdout(predicate::str::contains("446D8DE6  sceKernelCreateThread"));
}

/// compute-nid requires at least one name.
#[test]
fn compute_nid_requires_names() {
    assert_cmd::cargo::cargo_bin_cmd!("nidscope").arg("compute-nid").assert().failure();
}

/// analyze fails cleanly when no dataset is given and none is configured.
#[test]
fn analyze_fails_without_dataset() {
    let dir = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("init-project")
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No dataset given"));
}

/// analyze fails cleanly when the dataset file is missing.
#[test]
fn analyze_fails_for_missing_dataset_file() {
    let dir = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("init-project")
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("nidscope")
        .current_dir(dir.path())
        .arg("analyze")
        .arg("--file")
        .arg("datasets/nope.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
