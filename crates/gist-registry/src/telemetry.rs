//! Structured tracing setup for hosts that embed the registry.

use tracing_subscriber::EnvFilter;

use crate::config::RegistryConfig;

/// Error returned when a global subscriber is already installed.
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `filter`; an unparsable directive falls
/// back to `info`. `json` switches to one JSON object per line.
pub fn init_tracing(filter: &str, json: bool) -> Result<(), InitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

/// [`init_tracing`] with the config's `log_filter` and `log_json`.
pub fn init_from_config(config: &RegistryConfig) -> Result<(), InitError> {
    init_tracing(&config.log_filter, config.log_json)
}
