// crates/commit_snapshot/src/lib.rs

use chrono::{DateTime, FixedOffset, Local};
use git_command::{GitCommandError, WorkTree};
use thiserror::Error;

/// Timestamp layout used in generated commit messages.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Committer name used when the repository has none configured.
const FALLBACK_NAME: &str = "git_snapshot";

/// The commit a snapshot produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full object name.
    pub id: String,
    pub short_id: String,
    pub message: String,
    /// Committer date as recorded by git.
    pub timestamp: DateTime<FixedOffset>,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Failed to stage changes: {0}")]
    Stage(#[source] GitCommandError),
    #[error("Failed to read committer identity: {0}")]
    Identity(#[source] GitCommandError),
    #[error("Failed to create commit: {0}")]
    Commit(#[source] GitCommandError),
    #[error("Failed to read back the new commit: {0}")]
    ReadBack(#[source] GitCommandError),
    #[error("Unexpected commit metadata from git: {0:?}")]
    Metadata(String),
    #[error("Invalid commit timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Message used when the caller does not supply one, e.g.
/// `Snapshot created on 2024-01-02-03-04-05 on build-box`.
pub fn default_snapshot_message(now: &DateTime<Local>, host: &str) -> String {
    format!(
        "Snapshot created on {} on {}",
        now.format(TIMESTAMP_FORMAT),
        host
    )
}

/// Name of the machine we are running on.
pub fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

/// The supplied message if it is non-empty, otherwise a generated one.
pub fn resolve_message(message: Option<&str>) -> String {
    match message.filter(|m| !m.is_empty()) {
        Some(message) => message.to_string(),
        None => default_snapshot_message(&Local::now(), &hostname()),
    }
}

/// Stages every change in the working tree (additions, modifications and
/// deletions) and commits it.
///
/// A commit is created even when nothing changed, so repeated snapshots of an
/// unchanged source still leave a trace. The message is stored verbatim.
///
/// # Errors
///
/// Any git failure while staging, committing or reading the commit back.
pub fn commit_snapshot(tree: &WorkTree, message: Option<&str>) -> Result<CommitRecord, CommitError> {
    let message = resolve_message(message);

    tree.git(&["add", "--all"]).map_err(CommitError::Stage)?;

    let mut args = identity_overrides(tree)?;
    args.extend(
        ["commit", "--quiet", "--allow-empty", "--cleanup=verbatim", "-m"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(message.clone());
    tree.git(args.as_slice()).map_err(CommitError::Commit)?;

    let record = read_head(tree, message)?;
    log::info!("Created commit {} in {}", record.short_id, tree.root().display());
    Ok(record)
}

/// `-c user.name=… -c user.email=…` for whichever of the two is not configured.
fn identity_overrides(tree: &WorkTree) -> Result<Vec<String>, CommitError> {
    let mut args = Vec::new();
    if tree
        .config_value("user.name")
        .map_err(CommitError::Identity)?
        .is_none()
    {
        log::info!("No user.name configured; committing as {}", FALLBACK_NAME);
        args.push("-c".to_string());
        args.push(format!("user.name={}", FALLBACK_NAME));
    }
    if tree
        .config_value("user.email")
        .map_err(CommitError::Identity)?
        .is_none()
    {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| FALLBACK_NAME.to_string());
        let email = format!("{}@{}", user, hostname());
        log::info!("No user.email configured; committing as {}", email);
        args.push("-c".to_string());
        args.push(format!("user.email={}", email));
    }
    Ok(args)
}

fn read_head(tree: &WorkTree, message: String) -> Result<CommitRecord, CommitError> {
    let raw = tree
        .git(&["log", "-1", "--format=%H%n%h%n%cI"])
        .map_err(CommitError::ReadBack)?;
    let mut lines = raw.lines();
    let (Some(id), Some(short_id), Some(date)) = (lines.next(), lines.next(), lines.next()) else {
        return Err(CommitError::Metadata(raw.clone()));
    };
    let timestamp =
        DateTime::parse_from_rfc3339(date).map_err(|source| CommitError::Timestamp {
            value: date.to_string(),
            source,
        })?;
    Ok(CommitRecord {
        id: id.to_string(),
        short_id: short_id.to_string(),
        message,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use git_command::run_git;
    use regex::Regex;
    use std::fs;
    use tempfile::TempDir;

    fn new_repo() -> (TempDir, WorkTree) {
        let td = TempDir::new().expect("tempdir");
        run_git(td.path(), &["init", "--quiet"]).expect("git init");
        let tree = WorkTree::at(td.path());
        tree.git(&["config", "user.name", "Test User"]).unwrap();
        tree.git(&["config", "user.email", "test@example.com"]).unwrap();
        (td, tree)
    }

    fn head_message(tree: &WorkTree) -> String {
        tree.git(&["log", "-1", "--format=%B"]).unwrap()
    }

    #[test]
    fn default_message_uses_timestamp_and_host() {
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            default_snapshot_message(&now, "build-box"),
            "Snapshot created on 2024-01-02-03-04-05 on build-box"
        );
    }

    #[test]
    fn empty_message_is_replaced() {
        assert_eq!(resolve_message(Some("keep")), "keep");
        assert!(resolve_message(Some("")).starts_with("Snapshot created on "));
        assert!(resolve_message(None).ends_with(&format!(" on {}", hostname())));
    }

    #[test]
    fn supplied_message_is_recorded_verbatim() {
        let (td, tree) = new_repo();
        fs::write(td.path().join("a.txt"), "hello").unwrap();
        let message = "# weekly backup\n\n  indented body line";

        let record = commit_snapshot(&tree, Some(message)).unwrap();

        assert_eq!(record.message, message);
        assert_eq!(head_message(&tree), message.trim_end());
    }

    #[test]
    fn generated_message_matches_pattern() {
        let (td, tree) = new_repo();
        fs::write(td.path().join("a.txt"), "hello").unwrap();

        let record = commit_snapshot(&tree, None).unwrap();

        let pattern =
            Regex::new(r"^Snapshot created on \d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2} on .+$").unwrap();
        assert!(pattern.is_match(&record.message), "got {:?}", record.message);
        assert_eq!(head_message(&tree), record.message);
    }

    #[test]
    fn record_matches_head() {
        let (td, tree) = new_repo();
        fs::write(td.path().join("a.txt"), "hello").unwrap();

        let record = commit_snapshot(&tree, Some("first")).unwrap();

        assert_eq!(Some(record.id.clone()), tree.head_commit().unwrap());
        assert!(record.id.starts_with(&record.short_id));
        let age = Local::now().fixed_offset() - record.timestamp;
        assert!(age.num_seconds().abs() < 300, "timestamp too far off: {}", record.timestamp);
    }

    #[test]
    fn stages_additions_modifications_and_deletions() {
        let (td, tree) = new_repo();
        fs::write(td.path().join("keep.txt"), "v1").unwrap();
        fs::write(td.path().join("gone.txt"), "bye").unwrap();
        commit_snapshot(&tree, Some("base")).unwrap();

        fs::write(td.path().join("keep.txt"), "v2").unwrap();
        fs::remove_file(td.path().join("gone.txt")).unwrap();
        fs::write(td.path().join("new.txt"), "hi").unwrap();
        commit_snapshot(&tree, Some("changes")).unwrap();

        let status = tree.git(&["status", "--porcelain"]).unwrap();
        assert!(status.is_empty(), "uncommitted changes left: {}", status);
        let changed = tree
            .git(&["show", "--name-status", "--format=", "HEAD"])
            .unwrap();
        assert!(changed.contains("M\tkeep.txt"));
        assert!(changed.contains("D\tgone.txt"));
        assert!(changed.contains("A\tnew.txt"));
    }

    #[test]
    fn unchanged_tree_still_produces_a_commit() {
        let (td, tree) = new_repo();
        fs::write(td.path().join("a.txt"), "hello").unwrap();
        let first = commit_snapshot(&tree, Some("one")).unwrap();
        let second = commit_snapshot(&tree, Some("two")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(tree.git(&["rev-list", "--count", "HEAD"]).unwrap(), "2");
        let diff = tree.git(&["diff", "--stat", first.id.as_str(), second.id.as_str()]).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn configured_identity_is_not_overridden() {
        let (_td, tree) = new_repo();
        assert!(identity_overrides(&tree).unwrap().is_empty());
    }
}
