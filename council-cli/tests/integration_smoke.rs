//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_top_level_help() {
    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("model leaderboard"));
}

#[test]
fn test_list_help() {
    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.arg("list").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Include archived"));
}

#[test]
fn test_scores_help() {
    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.arg("scores").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("leaderboard as JSON"));
}

#[test]
fn test_show_requires_id() {
    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.arg("show");

    cmd.assert().failure();
}

#[test]
fn test_scores_on_empty_store() {
    let data_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.env("COUNCIL_BACKEND", "json")
        .env("COUNCIL_DATA_DIR", data_dir.path())
        .arg("scores");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No rankings yet."));
}

#[test]
fn test_new_then_list_round_trip() {
    let data_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.env("COUNCIL_BACKEND", "json")
        .env("COUNCIL_DATA_DIR", data_dir.path())
        .arg("new");
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("councilctl").unwrap();
    cmd.env("COUNCIL_BACKEND", "json")
        .env("COUNCIL_DATA_DIR", data_dir.path())
        .arg("list");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("New Conversation"));
}
