pub mod config;
pub mod error;

pub use config::{
    CompanionConfig, Config, FetchConfig, GlanceConfig, RefreshConfig, StorageConfig,
    ValidationResult,
};
pub use error::{AppError, ConfigError, RelayError, StorageError, WeatherError};

use anyhow::Result;

/// Initialize logging for whichever process (foreground or worker) is starting.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::debug!("Instant Weather core initialized");
    Ok(())
}
