// crates/git_command/src/lib.rs

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

/// Failure of a single `git` invocation.
#[derive(Debug, Error)]
pub enum GitCommandError {
    /// The `git` executable could not be started at all.
    #[error("Error executing git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: io::Error,
    },
    /// `git` ran but exited with a non-zero status.
    #[error("git {args} exited with status {}: {stderr}", status_text(.code))]
    Failed {
        args: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl GitCommandError {
    /// Exit code of the failed command, if it ran and was not killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GitCommandError::Spawn { .. } => None,
            GitCommandError::Failed { code, .. } => *code,
        }
    }

    /// Captured standard error of the failed command (empty for spawn failures).
    pub fn stderr(&self) -> &str {
        match self {
            GitCommandError::Spawn { .. } => "",
            GitCommandError::Failed { stderr, .. } => stderr,
        }
    }
}

fn status_text(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn describe<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn output<S: AsRef<OsStr>>(cwd: &Path, args: &[S]) -> Result<Output, GitCommandError> {
    log::debug!("git {} (in {})", describe(args), cwd.display());
    Command::new("git")
        .args(args)
        .current_dir(cwd)
        // Never block on a credential prompt; an unattended snapshot must fail instead.
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|source| GitCommandError::Spawn {
            args: describe(args),
            source,
        })
}

/// Runs `git <args>` inside `cwd` and returns its trimmed standard output.
///
/// # Errors
///
/// Returns [`GitCommandError::Spawn`] if git cannot be started and
/// [`GitCommandError::Failed`] if it exits unsuccessfully.
pub fn run_git<S: AsRef<OsStr>>(cwd: &Path, args: &[S]) -> Result<String, GitCommandError> {
    let out = output(cwd, args)?;
    if out.status.success() {
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        log::debug!("git {} failed: {}", describe(args), stderr);
        Err(GitCommandError::Failed {
            args: describe(args),
            code: out.status.code(),
            stderr,
        })
    }
}

/// Runs `git <args>` inside `cwd` and reports only whether it succeeded.
///
/// Useful for probes such as `show-ref --verify --quiet`, where a non-zero
/// exit is an answer rather than a failure.
///
/// # Errors
///
/// Returns [`GitCommandError::Spawn`] if git cannot be started.
pub fn git_succeeds<S: AsRef<OsStr>>(cwd: &Path, args: &[S]) -> Result<bool, GitCommandError> {
    Ok(output(cwd, args)?.status.success())
}

/// Maps "exited with `code`" to `Ok(None)` and passes every other outcome through.
fn none_on_exit<T>(
    result: Result<T, GitCommandError>,
    code: i32,
) -> Result<Option<T>, GitCommandError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.exit_code() == Some(code) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Handle on the root of a git working tree.
///
/// The handle only remembers where the tree lives; all state is read back
/// from git on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    /// Wraps `root` without checking it. Prefer [`WorkTree::discover`].
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns a handle if `dir` is itself the top level of a working tree.
    ///
    /// A directory nested somewhere inside another repository does not count.
    ///
    /// # Errors
    ///
    /// Fails if git cannot be started or `dir` cannot be canonicalized.
    pub fn discover(dir: &Path) -> Result<Option<Self>, GitCommandError> {
        let toplevel = match run_git(dir, &["rev-parse", "--show-toplevel"]) {
            Ok(toplevel) => toplevel,
            Err(GitCommandError::Failed { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        let canonical = |p: &Path| {
            fs::canonicalize(p).map_err(|source| GitCommandError::Spawn {
                args: format!("rev-parse --show-toplevel ({})", p.display()),
                source,
            })
        };
        if canonical(Path::new(&toplevel))? == canonical(dir)? {
            Ok(Some(Self::at(dir)))
        } else {
            Ok(None)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs `git <args>` in the working tree.
    ///
    /// # Errors
    ///
    /// See [`run_git`].
    pub fn git<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String, GitCommandError> {
        run_git(&self.root, args)
    }

    /// # Errors
    ///
    /// See [`git_succeeds`].
    pub fn git_succeeds<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<bool, GitCommandError> {
        git_succeeds(&self.root, args)
    }

    /// Name of the checked-out branch, or `None` on a detached HEAD.
    ///
    /// Works on an unborn branch too (a fresh repository before its first commit).
    ///
    /// # Errors
    ///
    /// Fails if git cannot be started or reports anything but "not a symbolic ref".
    pub fn current_branch(&self) -> Result<Option<String>, GitCommandError> {
        none_on_exit(self.git(&["symbolic-ref", "--quiet", "--short", "HEAD"]), 1)
    }

    /// Full hash of the commit at HEAD, or `None` if the branch is unborn.
    ///
    /// # Errors
    ///
    /// Fails if git cannot be started or the query fails for another reason.
    pub fn head_commit(&self) -> Result<Option<String>, GitCommandError> {
        none_on_exit(
            self.git(&["rev-parse", "--verify", "--quiet", "HEAD^{commit}"]),
            1,
        )
    }

    /// Whether `refs/heads/<name>` exists.
    ///
    /// # Errors
    ///
    /// Fails if git cannot be started.
    pub fn has_local_branch(&self, name: &str) -> Result<bool, GitCommandError> {
        let reference = format!("refs/heads/{}", name);
        self.git_succeeds(&["show-ref", "--verify", "--quiet", reference.as_str()])
    }

    /// Effective value of a config key, or `None` if it is unset.
    ///
    /// # Errors
    ///
    /// Fails if git cannot be started or the config cannot be read.
    pub fn config_value(&self, key: &str) -> Result<Option<String>, GitCommandError> {
        none_on_exit(self.git(&["config", "--get", key]), 1)
    }
}
