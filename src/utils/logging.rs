//! Logging setup

use tracing_subscriber::EnvFilter;

/// Directive used when neither `RUST_LOG` nor a level is usable
const FALLBACK_LEVEL: &str = "info";

/// Build the filter; `RUST_LOG` takes precedence over `level`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Install the global subscriber, writing to stderr.
///
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(level: &str, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
