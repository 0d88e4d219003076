//! Diagnostic tracing for the marking pool.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG`, output to stderr.
//!   Lock hand-offs are logged at `trace`, pool setup at `info`, rubric
//!   persistence failures at `warn`.
//!
//! - **Progress lines (`io/events`)**: the per-TA console output on stdout.
//!   Always printed, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format, with thread names so each TA is visible.
///
/// # Example
/// ```bash
/// RUST_LOG=marking=trace cargo run -- 3
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact(),
        )
        .init();
}
