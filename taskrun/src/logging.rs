//! Development-time tracing for debugging target runs.
//!
//! Diagnostics go to stderr and are filtered by `RUST_LOG`. Product output
//! (help text, executor and command output) goes to stdout and is unaffected.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `warn,taskrun=debug` when
/// `verbose` is set. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=taskrun=trace taskrun run app:build
/// ```
pub fn init(verbose: bool) {
    let fallback = if verbose { "warn,taskrun=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
