//! Launcher summary ("app glance"): a one-line digest shown beside the app
//! icon. It expires so a stale summary disappears instead of lingering.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{truncate_to, WeatherReading, CONDITIONS_BUFFER_SIZE};

/// One launcher-summary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlanceSlice {
    pub subtitle: String,
    pub expires_at: DateTime<Utc>,
}

impl GlanceSlice {
    /// Build the digest for `reading`, expiring `ttl` after `now`.
    pub fn for_reading(reading: &WeatherReading, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            subtitle: format_subtitle(reading),
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `"{temperature}°C / {conditions}"`, bounded like every stored string.
pub fn format_subtitle(reading: &WeatherReading) -> String {
    let full = format!("{}°C / {}", reading.temperature(), reading.condition_text());
    truncate_to(&full, CONDITIONS_BUFFER_SIZE - 1)
}

/// Surface that displays the launcher summary.
pub trait LauncherSummary {
    fn publish(&mut self, slice: GlanceSlice) -> anyhow::Result<()>;
}
