//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "warn,advisor_stock=info,advisor_cli=info";

/// Initialize tracing subscriber with default configuration
///
/// Reads the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Output goes to stderr so it never mixes with the report printed on stdout.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_FILTER);
}

/// Initialize tracing with an explicit fallback filter
pub fn init_tracing_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second initialization (tests, embedding) is not an error worth surfacing
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
