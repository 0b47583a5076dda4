mod support;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

use support::{page_body, FakeApi};

fn soopup() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_soopup"));
    cmd.env_remove("SOOPUP_LOG");
    cmd
}

#[test]
fn prints_version() {
    soopup()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    soopup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--cutoff"))
        .stdout(predicate::str::contains("--once"));
}

#[test]
fn rejects_zero_cutoff() {
    soopup()
        .args(["--cutoff", "0", "--once", "https://www.sooplive.co.kr/station/a/post/1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn once_rejects_foreign_urls() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "{}\n").unwrap();

    soopup()
        .arg("--config")
        .arg(&config)
        .args(["--once", "https://example.com/station/a/post/1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("URL format is not valid"));
}

#[test]
fn once_prints_ranking_with_cutoff() {
    let api = FakeApi::start(|hit| (200, page_body(hit.page, 2, |id| id % 1000 + 1)));
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        format!("api:\n  base_url: {}\npoll:\n  retries: 0\n", api.base_url()),
    )
    .unwrap();

    soopup()
        .arg("--config")
        .arg(&config)
        .args([
            "--once",
            "--cutoff",
            "2",
            "https://www.sooplive.co.kr/station/lilpa0309/post/185132049",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 comments ranked, 2 pages"))
        .stdout(predicate::str::contains("---- cutoff 2 (rank 1) ----"))
        .stdout(predicate::str::contains("nick1001 (user1001)"));
}
