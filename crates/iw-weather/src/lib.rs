//! Weather data lifecycle for Instant Weather
//!
//! Fetches the current weather through the paired phone, correlates and
//! retries requests, and keeps the last known reading in persistent storage.

pub mod cache;
pub mod companion;
pub mod error;
pub mod fetch;
pub mod glance;
pub mod provider;
pub mod relay;
pub mod store;
pub mod types;

pub use cache::WeatherCache;
pub use companion::{Companion, WeatherSource};
pub use error::{ChannelError, FetchError, ProviderError, StorageError};
pub use fetch::{
    Completion, ContextId, Delivery, FetchResult, FetchSession, FetchState, IgnoreReason,
    SessionId,
};
pub use glance::{GlanceSlice, LauncherSummary};
pub use provider::{Observation, OpenWeatherMapProvider};
pub use relay::{Dictionary, RelayChannel, RelayEvent, RelayFailure, RelayLink};
pub use store::{MemoryStore, PersistentStore, SqliteStore};
pub use types::{classify, ConditionCategory, WeatherReading};
