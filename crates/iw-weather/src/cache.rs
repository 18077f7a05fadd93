//! Last-known weather reading, persisted across activations.
//!
//! The three fields live under separate keys. A fourth key, the commit
//! marker, is cleared before the fields are written and set after the last
//! one succeeds, so a reader never sees a half-written reading as present.

use crate::error::StorageError;
use crate::store::{PersistKey, PersistentStore};
use crate::types::WeatherReading;

pub const TEMPERATURE_KEY: PersistKey = 0;
pub const CONDITIONS_KEY: PersistKey = 1;
pub const CONDITIONS_ID_KEY: PersistKey = 2;
pub const COMMIT_KEY: PersistKey = 3;

const COMMITTED: i32 = 1;
const WRITING: i32 = 0;

/// Persistent cache holding at most one complete `WeatherReading`.
#[derive(Debug, Clone)]
pub struct WeatherCache<S> {
    store: S,
}

impl<S: PersistentStore> WeatherCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    /// True iff a complete reading is stored.
    pub fn exists(&self) -> bool {
        match self.committed() {
            Ok(committed) => committed,
            Err(e) => {
                tracing::warn!("Weather cache unreadable, treating as empty: {}", e);
                false
            }
        }
    }

    /// The stored reading, or `None` if nothing complete is stored.
    pub fn load(&self) -> Option<WeatherReading> {
        match self.try_load() {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("Failed to load cached weather: {}", e);
                None
            }
        }
    }

    /// Persist every field of `reading`, replacing any previous reading.
    pub fn store(&self, reading: &WeatherReading) -> Result<(), StorageError> {
        // Invalidate first: if any later write fails the old reading is
        // gone but no mix of old and new fields is visible.
        self.store.write_int(COMMIT_KEY, WRITING)?;
        self.store.write_int(TEMPERATURE_KEY, reading.temperature())?;
        self.store.write_string(CONDITIONS_KEY, reading.condition_text())?;
        self.store.write_int(CONDITIONS_ID_KEY, reading.condition_code())?;
        self.store.write_int(COMMIT_KEY, COMMITTED)?;

        tracing::debug!(
            temperature = reading.temperature(),
            code = reading.condition_code(),
            "Stored weather reading"
        );
        Ok(())
    }

    fn committed(&self) -> Result<bool, StorageError> {
        Ok(self.store.read_int(COMMIT_KEY)? == Some(COMMITTED)
            && self.store.contains(TEMPERATURE_KEY)?
            && self.store.contains(CONDITIONS_KEY)?
            && self.store.contains(CONDITIONS_ID_KEY)?)
    }

    fn try_load(&self) -> Result<Option<WeatherReading>, StorageError> {
        if !self.committed()? {
            return Ok(None);
        }

        let temperature = self.store.read_int(TEMPERATURE_KEY)?;
        let text = self.store.read_string(CONDITIONS_KEY)?;
        let code = self.store.read_int(CONDITIONS_ID_KEY)?;

        Ok(match (temperature, text, code) {
            (Some(temperature), Some(text), Some(code)) => {
                Some(WeatherReading::new(temperature, code, text))
            }
            _ => None,
        })
    }
}
