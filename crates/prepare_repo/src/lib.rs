// crates/prepare_repo/src/lib.rs

use git_command::{run_git, GitCommandError, WorkTree};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepareRepoError {
    #[error("Failed to create destination directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Destination {} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Failed to initialize a git repository in {}: {source}", path.display())]
    Init {
        path: PathBuf,
        #[source]
        source: GitCommandError,
    },
    #[error("Failed to switch to branch '{branch}': {source}")]
    Checkout {
        branch: String,
        #[source]
        source: GitCommandError,
    },
    #[error(transparent)]
    Git(#[from] GitCommandError),
}

/// Makes sure `destination` is the root of a git working tree checked out on
/// `branch` (or on whatever branch it already has when `branch` is `None`).
///
/// - A missing directory is created, parents included.
/// - A directory that is not itself a repository root is initialized in place.
/// - A requested branch is switched to; if it does not exist locally it is
///   created from the current HEAD.
///
/// # Errors
///
/// Filesystem failures and every git failure other than "the branch does not
/// exist yet" are returned as-is.
pub fn prepare_repo(destination: &Path, branch: Option<&str>) -> Result<WorkTree, PrepareRepoError> {
    if destination.exists() && !destination.is_dir() {
        return Err(PrepareRepoError::NotADirectory(destination.to_path_buf()));
    }
    fs::create_dir_all(destination).map_err(|source| PrepareRepoError::CreateDir {
        path: destination.to_path_buf(),
        source,
    })?;

    let tree = match WorkTree::discover(destination)? {
        Some(tree) => {
            log::debug!("Using existing repository at {}", destination.display());
            tree
        }
        None => {
            log::info!("Initializing git repository in {}", destination.display());
            run_git(destination, &["init", "--quiet"]).map_err(|source| PrepareRepoError::Init {
                path: destination.to_path_buf(),
                source,
            })?;
            WorkTree::at(destination)
        }
    };

    if let Some(branch) = branch {
        switch_branch(&tree, branch)?;
    }

    Ok(tree)
}

fn switch_branch(tree: &WorkTree, branch: &str) -> Result<(), PrepareRepoError> {
    let checkout_err = |source: GitCommandError| PrepareRepoError::Checkout {
        branch: branch.to_string(),
        source,
    };

    // Nothing to switch from before the first commit: point HEAD at the branch
    // and let the first snapshot create it.
    if tree.head_commit()?.is_none() && !tree.has_local_branch(branch)? {
        if tree.current_branch()?.as_deref() != Some(branch) {
            log::info!("Selecting branch '{}' in unborn repository", branch);
            let reference = format!("refs/heads/{}", branch);
            tree.git(&["check-ref-format", reference.as_str()])
                .map_err(checkout_err)?;
            tree.git(&["symbolic-ref", "HEAD", reference.as_str()])
                .map_err(checkout_err)?;
        }
        return Ok(());
    }

    match tree.git(&["switch", "--quiet", branch]) {
        Ok(_) => Ok(()),
        Err(err) if !tree.has_local_branch(branch)? => {
            log::warn!(
                "Branch '{}' does not exist locally ({}); creating it",
                branch,
                err.stderr()
            );
            tree.git(&["switch", "--quiet", "-c", branch])
                .map(|_| ())
                .map_err(checkout_err)
        }
        Err(err) => Err(checkout_err(err)),
    }
}
