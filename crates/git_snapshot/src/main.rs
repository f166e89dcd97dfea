// crates/git_snapshot/src/main.rs

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use std::env;
use std::process::exit;

use git_snapshot::logging::init_logging;
use git_snapshot::{build_cli, create_snapshot, SnapshotConfig, SnapshotError, REMOTE_ENV};

fn main() -> Result<()> {
    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                // Usage errors (including missing directories) exit with 1.
                eprint!("{}", err);
                exit(1);
            }
        },
    };
    let config = SnapshotConfig::from_matches(&matches, env::var(REMOTE_ENV).ok())
        .context("Source and destination directories are required")?;
    init_logging(config.verbose);
    log::debug!("{:?}", config);

    match create_snapshot(&config) {
        Ok(outcome) => {
            if let Some(err) = &outcome.copy_error {
                println!("Error copying files: {}", err);
            }
            println!("{}", outcome.summary_line());
            Ok(())
        }
        Err(SnapshotError::Copy(err)) => {
            println!("Error copying files: {}", err);
            exit(1);
        }
        Err(err) => Err(err).context(format!(
            "Failed to snapshot {} into {}",
            config.source.display(),
            config.destination.display()
        )),
    }
}
