//! Binary-level CLI tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_serve() {
    Command::cargo_bin("peek")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("peek")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("peek"));
}

#[test]
fn test_serve_rejects_missing_report_dir() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("peek")
        .unwrap()
        .args(["serve", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a peek report directory"));
}
