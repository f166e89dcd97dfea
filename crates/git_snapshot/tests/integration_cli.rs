// crates/git_snapshot/tests/integration_cli.rs

use assert_cmd::Command;
use git_command::run_git;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn git_snapshot() -> Command {
    let mut cmd = Command::cargo_bin("git_snapshot").unwrap();
    cmd.env_remove("GIT_SNAPSHOT_REMOTE").env_remove("RUST_LOG");
    cmd
}

fn source_with_file(root: &Path) -> std::path::PathBuf {
    let source = root.join("source");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "hello").unwrap();
    source
}

#[test]
fn help_exits_successfully() {
    git_snapshot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--push"));
}

#[test]
fn missing_destination_is_a_usage_error() {
    git_snapshot()
        .arg("only-source")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn snapshot_reports_branch_and_commit() {
    let td = TempDir::new().unwrap();
    let source = source_with_file(td.path());
    let destination = td.path().join("destination");

    git_snapshot()
        .arg(&source)
        .arg(&destination)
        .args(["-b", "nightly", "-m", "Nightly export"])
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(
                r"^Snapshot created on branch nightly with commit [0-9a-f]{40}\n$",
            )
            .unwrap(),
        );

    assert_eq!(
        fs::read_to_string(destination.join("source").join("a.txt")).unwrap(),
        "hello"
    );
    assert_eq!(
        run_git(&destination, &["log", "-1", "--format=%B"]).unwrap(),
        "Nightly export"
    );
}

#[test]
fn default_message_names_the_host() {
    let td = TempDir::new().unwrap();
    let source = source_with_file(td.path());
    let destination = td.path().join("destination");

    git_snapshot().arg(&source).arg(&destination).assert().success();

    let message = run_git(&destination, &["log", "-1", "--format=%B"]).unwrap();
    let pattern =
        regex::Regex::new(r"^Snapshot created on \d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2} on .+$").unwrap();
    assert!(pattern.is_match(&message), "unexpected message: {}", message);
}

#[test]
fn missing_source_fails_with_copy_diagnostic() {
    let td = TempDir::new().unwrap();
    let destination = td.path().join("destination");

    git_snapshot()
        .arg(td.path().join("missing"))
        .arg(&destination)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("Error copying files:"));

    assert!(run_git(&destination, &["rev-parse", "--verify", "--quiet", "HEAD"]).is_err());
}

#[test]
fn keep_going_commits_after_copy_failure() {
    let td = TempDir::new().unwrap();
    let destination = td.path().join("destination");

    git_snapshot()
        .arg(td.path().join("missing"))
        .arg(&destination)
        .arg("--keep-going")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error copying files:"))
        .stdout(predicate::str::contains("Snapshot created on branch"));
}

#[test]
fn push_without_remote_fails() {
    let td = TempDir::new().unwrap();
    let source = source_with_file(td.path());

    git_snapshot()
        .arg(&source)
        .arg(td.path().join("destination"))
        .arg("-p")
        .assert()
        .failure()
        .stderr(predicate::str::contains("origin"));
}

#[test]
fn push_publishes_to_bare_remote() {
    let td = TempDir::new().unwrap();
    let source = source_with_file(td.path());
    let destination = td.path().join("destination");
    let remote = td.path().join("remote.git");
    fs::create_dir_all(&remote).unwrap();
    run_git(&remote, &["init", "--bare", "--quiet"]).unwrap();
    fs::create_dir_all(&destination).unwrap();
    run_git(&destination, &["init", "--quiet"]).unwrap();
    let url = remote.to_string_lossy().into_owned();
    run_git(&destination, &["remote", "add", "backup", url.as_str()]).unwrap();

    git_snapshot()
        .arg(&source)
        .arg(&destination)
        .args(["-b", "snapshots", "--push"])
        .env("GIT_SNAPSHOT_REMOTE", "backup")
        .assert()
        .success();

    let local = run_git(&destination, &["rev-parse", "HEAD"]).unwrap();
    let published = run_git(&remote, &["rev-parse", "refs/heads/snapshots"]).unwrap();
    assert_eq!(local, published);
}
