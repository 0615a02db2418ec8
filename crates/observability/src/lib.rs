//! Shared tracing/logging setup for the akademi services.

use tracing_subscriber::EnvFilter;

/// Initialize process-wide tracing: JSON lines to stdout, filtered via
/// `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops, which keeps
/// test binaries that spin up several servers from panicking.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
