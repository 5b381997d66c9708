//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::AppError;

/// Build the level filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber: JSON when `format = "json"`, pretty
/// otherwise. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    let filter = env_filter(config);

    let result = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    result.map_err(|e| AppError::internal(format!("Failed to initialise logging: {e}")))
}
