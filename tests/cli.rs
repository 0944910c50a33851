//! Binary-level tests for argument handling and the dry-run plan
//!
//! Nothing here contacts a node: only `--help`, argument errors and
//! `--dry-run` are exercised.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn mbt() -> Command {
    let mut cmd = Command::cargo_bin("mbt").unwrap();
    for var in [
        "PERF_TEST_USER",
        "PERF_TEST_PASS",
        "PERF_TEST_MIN_PORT",
        "PERF_TEST_MAX_PORT",
        "PERF_TEST_SSH_PORT",
        "PERF_TEST_SETTLE_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn node_file(nodes: &[&str]) -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ips_list.txt");
    fs::write(&path, format!("# lab fleet\n{}\n", nodes.join("\n"))).unwrap();
    let path = path.to_str().unwrap().to_string();
    (temp_dir, path)
}

#[test]
fn test_help_lists_options() {
    mbt()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--ip-file-path"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("PERF_TEST_USER"));
}

#[test]
fn test_version_reports_build_info() {
    mbt()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("commit: "))
        .stdout(predicate::str::contains("built: "))
        .stdout(predicate::str::contains("target: "));
}

#[test]
fn test_dry_run_half_full_plan() {
    let (dir, path) = node_file(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);

    mbt()
        .current_dir(dir.path())
        .args(["--dry-run", "--no-color", "--ip-file-path", &path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total test pairs: 6"))
        .stdout(predicate::str::contains("10.0.0.1->10.0.0.2, 10.0.0.3->10.0.0.4"))
        .stdout(predicate::str::contains("Batch #3"))
        .stdout(predicate::str::contains("Batch #4").not());

    // No result directory is created for a dry run
    let created: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("perftest_result_")
        })
        .collect();
    assert!(created.is_empty());
}

#[test]
fn test_dry_run_full_mesh_plan() {
    let (dir, path) = node_file(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);

    mbt()
        .current_dir(dir.path())
        .args([
            "--dry-run",
            "--no-color",
            "--mode",
            "full_mesh",
            "--ip-file-path",
            &path,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total test pairs: 6"))
        .stdout(predicate::str::contains("full_mesh"));
}

#[test]
fn test_dry_run_falls_back_to_default_nodes() {
    let dir = TempDir::new().unwrap();

    mbt()
        .current_dir(dir.path())
        .args(["--dry-run", "--no-color", "--ip-file-path", "missing.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total test pairs: 91"))
        .stderr(predicate::str::contains("Using default node list"));
}

#[test]
fn test_invalid_mode_rejected() {
    mbt()
        .args(["--dry-run", "--mode", "ring"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid topology mode"));
}

#[test]
fn test_invalid_worker_count_rejected() {
    mbt().args(["--dry-run", "--workers", "0"]).assert().failure();
}

#[test]
fn test_single_node_fails_validation() {
    let (dir, path) = node_file(&["10.0.0.1"]);

    mbt()
        .current_dir(dir.path())
        .args(["--dry-run", "--no-color", "--ip-file-path", &path])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("At least two nodes"));
}

#[test]
fn test_color_flags_conflict() {
    mbt().args(["--color", "--no-color", "--dry-run"]).assert().failure();
}
