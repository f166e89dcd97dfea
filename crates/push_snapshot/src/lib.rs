// crates/push_snapshot/src/lib.rs

use git_command::{GitCommandError, WorkTree};
use std::path::PathBuf;
use thiserror::Error;

/// Remote pushed to unless told otherwise.
pub const DEFAULT_REMOTE: &str = "origin";

/// How the branch reached the remote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote already had the branch and it was fast-forwarded.
    Updated,
    /// The remote lacked the branch; it was created and set as upstream.
    PublishedWithUpstream,
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Cannot push from a detached HEAD in {}", .0.display())]
    DetachedHead(PathBuf),
    #[error("Failed to query remote '{remote}': {source}")]
    RemoteQuery {
        remote: String,
        #[source]
        source: GitCommandError,
    },
    #[error("Failed to push '{branch}' to '{remote}': {source}")]
    Push {
        remote: String,
        branch: String,
        #[source]
        source: GitCommandError,
    },
    #[error(transparent)]
    Git(#[from] GitCommandError),
}

/// Pushes the checked-out branch to `remote`.
///
/// If the remote has no branch of that name yet, it is published with
/// `--set-upstream` so the local branch tracks it from then on.
///
/// # Errors
///
/// A detached HEAD, an unreachable or unknown remote, or a rejected push.
pub fn push_snapshot(tree: &WorkTree, remote: &str) -> Result<PushOutcome, PushError> {
    let branch = tree
        .current_branch()?
        .ok_or_else(|| PushError::DetachedHead(tree.root().to_path_buf()))?;
    let push_err = |source: GitCommandError| PushError::Push {
        remote: remote.to_string(),
        branch: branch.clone(),
        source,
    };

    if remote_has_branch(tree, remote, &branch)? {
        log::info!("Pushing '{}' to '{}'", branch, remote);
        tree.git(&["push", "--quiet", remote, branch.as_str()])
            .map_err(push_err)?;
        Ok(PushOutcome::Updated)
    } else {
        log::warn!(
            "Remote '{}' has no branch '{}'; publishing it with upstream tracking",
            remote,
            branch
        );
        tree.git(&["push", "--quiet", "--set-upstream", remote, branch.as_str()])
            .map_err(push_err)?;
        Ok(PushOutcome::PublishedWithUpstream)
    }
}

/// Whether `remote` currently advertises `refs/heads/<branch>`.
fn remote_has_branch(tree: &WorkTree, remote: &str, branch: &str) -> Result<bool, PushError> {
    let reference = format!("refs/heads/{}", branch);
    // `--exit-code` makes ls-remote exit with 2 when nothing matched.
    match tree.git(&["ls-remote", "--exit-code", "--heads", remote, reference.as_str()]) {
        Ok(_) => Ok(true),
        Err(err) if err.exit_code() == Some(2) => Ok(false),
        Err(source) => Err(PushError::RemoteQuery {
            remote: remote.to_string(),
            source,
        }),
    }
}
