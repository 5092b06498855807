//! `tracing-subscriber` setup

use batchwire_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to the configured level and then to
/// `info` when the configured directive does not parse.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed; calling this
/// more than once is harmless.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(build_filter(config)).with_target(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "logging initialised");
    }
    installed
}
