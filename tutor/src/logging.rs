//! Tracing setup shared by the `tutor` CLI and the UI server.
//!
//! Diagnostics go to stderr and are controlled by `RUST_LOG`. Lesson output
//! never passes through tracing.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: `RUST_LOG` if set and valid, otherwise
/// `default_filter` (e.g. `"warn"` for the CLI). Compact lines on stderr.
///
/// `RUST_LOG=tutor::io::kernel=debug tutor-ui` traces every interpreter
/// round trip.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
