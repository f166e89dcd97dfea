// crates/git_snapshot/src/lib.rs

use commit_snapshot::{commit_snapshot, CommitError, CommitRecord};
use copy_tree::{copy_tree, CopySummary, CopyTreeError};
use git_command::GitCommandError;
use prepare_repo::{prepare_repo, PrepareRepoError};
use push_snapshot::{push_snapshot, PushError, PushOutcome};
use thiserror::Error;

pub mod config;
pub mod logging;

pub use config::{build_cli, SnapshotConfig, REMOTE_ENV};

/// Why a snapshot run stopped.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Prepare(#[from] PrepareRepoError),
    #[error("Error copying files: {0}")]
    Copy(#[from] CopyTreeError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Push(#[from] PushError),
    #[error(transparent)]
    Git(#[from] GitCommandError),
}

/// Result of a completed snapshot run.
#[derive(Debug)]
pub struct SnapshotOutcome {
    /// Branch the commit landed on (`None` only on a detached HEAD).
    pub branch: Option<String>,
    pub commit: CommitRecord,
    /// Present when the copy succeeded.
    pub copied: Option<CopySummary>,
    /// The copy failure that was tolerated because of `keep_going`.
    pub copy_error: Option<CopyTreeError>,
    /// Present when a push was requested.
    pub push: Option<PushOutcome>,
}

impl SnapshotOutcome {
    /// The one-line report printed after a run.
    pub fn summary_line(&self) -> String {
        format!(
            "Snapshot created on branch {} with commit {}",
            self.branch.as_deref().unwrap_or("HEAD"),
            self.commit.id
        )
    }
}

/// Runs one snapshot: prepare the destination repository, copy the source
/// into it, commit, and push if asked to.
///
/// A copy failure aborts the run before anything is committed unless
/// `config.keep_going` is set, in which case it is reported in the outcome
/// and the commit happens anyway.
///
/// # Errors
///
/// Whatever stage failed first.
pub fn create_snapshot(config: &SnapshotConfig) -> Result<SnapshotOutcome, SnapshotError> {
    log::info!(
        "Snapshotting {} into {}",
        config.source.display(),
        config.destination.display()
    );
    let tree = prepare_repo(&config.destination, config.branch.as_deref())?;

    let (copied, copy_error) = match copy_tree(&config.source, tree.root()) {
        Ok(summary) => (Some(summary), None),
        Err(err) if config.keep_going => {
            log::warn!("Copy failed, committing anyway: {}", err);
            (None, Some(err))
        }
        Err(err) => return Err(err.into()),
    };

    let commit = commit_snapshot(&tree, config.message.as_deref())?;

    let push = if config.push {
        Some(push_snapshot(&tree, &config.remote)?)
    } else {
        None
    };

    Ok(SnapshotOutcome {
        branch: tree.current_branch()?,
        commit,
        copied,
        copy_error,
        push,
    })
}
