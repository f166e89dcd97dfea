// crates/git_snapshot/src/config.rs

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use push_snapshot::DEFAULT_REMOTE;
use std::path::PathBuf;

/// Environment variable naming the remote to push to when `--remote` is absent.
pub const REMOTE_ENV: &str = "GIT_SNAPSHOT_REMOTE";

/// Everything one snapshot run needs, composed from the command line and
/// environment. Not modified after it is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Directory to snapshot.
    pub source: PathBuf,
    /// Working tree the snapshot is committed to.
    pub destination: PathBuf,
    /// Branch to commit on; `None` keeps whatever is checked out.
    pub branch: Option<String>,
    /// Commit message; `None` (or empty) means a generated one.
    pub message: Option<String>,
    pub push: bool,
    pub remote: String,
    /// Commit even if copying the source failed.
    pub keep_going: bool,
    pub verbose: bool,
}

impl SnapshotConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            branch: None,
            message: None,
            push: false,
            remote: DEFAULT_REMOTE.to_string(),
            keep_going: false,
            verbose: false,
        }
    }

    /// Builds the config from parsed arguments. `env_remote` is the value of
    /// [`REMOTE_ENV`], used when `--remote` was not given.
    ///
    /// Returns `None` when either directory is missing from `matches`.
    pub fn from_matches(matches: &ArgMatches, env_remote: Option<String>) -> Option<Self> {
        let source = matches.get_one::<PathBuf>("source_dir")?.clone();
        let destination = matches.get_one::<PathBuf>("destination_dir")?.clone();
        let remote = matches
            .get_one::<String>("remote")
            .cloned()
            .or(env_remote.filter(|r| !r.is_empty()))
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        Some(Self {
            source,
            destination,
            branch: matches.get_one::<String>("branch").cloned(),
            message: matches
                .get_one::<String>("message")
                .filter(|m| !m.is_empty())
                .cloned(),
            push: matches.get_flag("push"),
            remote,
            keep_going: matches.get_flag("keep_going"),
            verbose: matches.get_flag("verbose"),
        })
    }
}

/// Command-line definition for the `git_snapshot` binary.
pub fn build_cli() -> Command {
    Command::new("git_snapshot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Create a snapshot of a directory using git")
        .arg(
            Arg::new("source_dir")
                .required(true)
                .value_name("SOURCE_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("The directory to snapshot"),
        )
        .arg(
            Arg::new("destination_dir")
                .required(true)
                .value_name("DESTINATION_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("The directory to store the snapshot"),
        )
        .arg(
            Arg::new("branch")
                .short('b')
                .long("branch")
                .num_args(1)
                .value_name("NAME")
                .help("The branch to create the snapshot on"),
        )
        .arg(
            Arg::new("message")
                .short('m')
                .long("message")
                .num_args(1)
                .value_name("TEXT")
                .allow_hyphen_values(true)
                .help("The commit message to use"),
        )
        .arg(
            Arg::new("push")
                .short('p')
                .long("push")
                .action(ArgAction::SetTrue)
                .help("Push the changes to the remote"),
        )
        .arg(
            Arg::new("remote")
                .short('r')
                .long("remote")
                .num_args(1)
                .value_name("NAME")
                .help(format!(
                    "Remote to push to [env: {}] [default: {}]",
                    REMOTE_ENV, DEFAULT_REMOTE
                )),
        )
        .arg(
            Arg::new("keep_going")
                .long("keep-going")
                .action(ArgAction::SetTrue)
                .help("Commit even if copying the source directory fails"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose logging"),
        )
}
