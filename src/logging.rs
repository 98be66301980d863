//! Logging configuration for askdb.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr.
///
/// Honors `RUST_LOG`; defaults to `info` when unset. Stderr keeps logs out
/// of the query output on stdout.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
