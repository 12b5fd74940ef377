//! Logging setup for meshmap binaries and examples.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the program embedding it.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_filter`
/// when the variable is unset or unparsable.
///
/// Returns `false` if a global subscriber was already installed, which is
/// not treated as an error so tests and examples can call this freely.
pub fn init_logging(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
