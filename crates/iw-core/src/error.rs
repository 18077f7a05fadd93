//! Centralized error types for Instant Weather.
//!
//! Every failure is handled at the boundary where it occurs; these types
//! exist so that boundary can log the full context and show the user a
//! short, static message.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for the watch screen.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Storage(e) => e.user_message(),
            AppError::Relay(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// True for failures that a later attempt may fix. An abandoned fetch
    /// was stopped on purpose and is never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Relay(RelayError::Abandoned) => false,
            AppError::Relay(_) => true,
            _ => false,
        }
    }
}

/// Persistent storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage full: {0}")]
    Full(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Full(_) => "Watch storage is full. Weather was not saved.",
            StorageError::Unavailable(_) => "Saved weather is unavailable.",
        }
    }
}

/// Phone-relay communication errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Message dropped: {0}")]
    Dropped(String),

    #[error("No response before the deadline")]
    Timeout,

    #[error("Fetch abandoned")]
    Abandoned,
}

impl RelayError {
    pub fn user_message(&self) -> &'static str {
        match self {
            RelayError::SendFailed(_) | RelayError::Dropped(_) => {
                "Couldn't reach your phone.\nTrying again..."
            }
            RelayError::Timeout => {
                "Couldn't update weather info.\nTrying again...\n\n\
                 You may need to close this app\nand restart the companion app on your phone."
            }
            RelayError::Abandoned => "Weather update cancelled.",
        }
    }
}

/// Errors from the phone-side weather lookup.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather API error: {0}")]
    ApiError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::ApiError(_) => "Weather service error. Please try again.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherError::MalformedResponse(_) => "Received unexpected weather data.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}
