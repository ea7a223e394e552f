use config::LogConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging from the sidecar's log configuration.
///
/// Falls back to `info` when the configured level does not parse as an
/// `EnvFilter` directive.
pub fn init(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|e| {
        eprintln!(
            "Invalid log level '{}': {}. Falling back to 'info'",
            config.level, e
        );
        EnvFilter::new("info")
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_ansi(!config.strip_ansi))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_ansi(!config.strip_ansi))
            .try_init()
    }
}
