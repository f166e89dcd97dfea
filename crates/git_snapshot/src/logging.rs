// crates/git_snapshot/src/logging.rs

use tracing_subscriber::EnvFilter;

/// Installs a stderr logger for the process. Records from the `log` macros
/// used across the workspace are picked up as well.
///
/// The level is `warn`, or `debug` when `verbose` is set; `RUST_LOG`
/// overrides both. Calling this more than once is harmless.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_ok() {
        log::debug!("Logging initialized at default level {}", default_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_twice_does_not_panic() {
        init_logging(true);
        init_logging(false);
        log::debug!("still logging");
    }
}
