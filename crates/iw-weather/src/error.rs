//! Weather lifecycle error types.

use thiserror::Error;

use crate::relay::RelayFailure;

/// Persistent store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage full: needed {needed} bytes, {available} available")]
    Full { needed: usize, available: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Relay channel failures. Never fatal; the fetch session reports them and
/// the caller decides whether to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Outbox send failed: {0}")]
    SendFailed(RelayFailure),

    #[error("Inbound message dropped: {0}")]
    Dropped(RelayFailure),
}

/// Failure delivered through a fetch session's completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("No weather response before the deadline")]
    Timeout,

    #[error("Fetch session abandoned")]
    Abandoned,

    #[error("Fetch session already finished")]
    Finished,
}

/// Failures of the phone-side weather lookup.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API key rejected")]
    Unauthorized,

    #[error("Weather API returned status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Weather provider not configured: {0}")]
    NotConfigured(String),
}
