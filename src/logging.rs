//! Diagnostic logging for the `credstore` binary.
//!
//! The library only emits `tracing` events.  The binary installs a
//! stderr `fmt` subscriber filtered by `CREDSTORE_LOG` (same syntax as
//! `RUST_LOG`), defaulting to warnings so normal output stays clean.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CREDSTORE_LOG";

/// Install the global subscriber.
///
/// `verbose` raises the default level to `debug` when `CREDSTORE_LOG`
/// is not set.  Calling this twice is harmless; the second call is
/// ignored.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
