//! Key/value backends for the weather cache.
//!
//! The watch exposes persistent storage as small integer keys holding either
//! an integer or a short string. `PersistentStore` models exactly that, so
//! the cache's commit protocol doesn't depend on a backend having
//! transactions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;

/// Integer key into persistent storage.
pub type PersistKey = u32;

/// Minimal persistent key/value store.
pub trait PersistentStore {
    /// True if any value is stored under `key`.
    fn contains(&self, key: PersistKey) -> Result<bool, StorageError>;

    fn read_int(&self, key: PersistKey) -> Result<Option<i32>, StorageError>;

    fn read_string(&self, key: PersistKey) -> Result<Option<String>, StorageError>;

    fn write_int(&self, key: PersistKey, value: i32) -> Result<(), StorageError>;

    fn write_string(&self, key: PersistKey, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Int(i32),
    Text(String),
}

impl StoredValue {
    fn size(&self) -> usize {
        match self {
            StoredValue::Int(_) => std::mem::size_of::<i32>(),
            // Strings are stored with their terminator
            StoredValue::Text(s) => s.len() + 1,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<PersistKey, StoredValue>,
    quota: Option<usize>,
    failing_key: Option<PersistKey>,
}

impl MemoryInner {
    fn used(&self) -> usize {
        self.values.values().map(StoredValue::size).sum()
    }

    fn write(&mut self, key: PersistKey, value: StoredValue) -> Result<(), StorageError> {
        if self.failing_key == Some(key) {
            return Err(StorageError::Unavailable(format!("write to key {key} failed")));
        }

        if let Some(quota) = self.quota {
            let replaced = self.values.get(&key).map_or(0, StoredValue::size);
            let available = quota.saturating_sub(self.used() - replaced);
            if value.size() > available {
                return Err(StorageError::Full {
                    needed: value.size(),
                    available,
                });
            }
        }

        self.values.insert(key, value);
        Ok(())
    }
}

/// In-memory store. Clones share the same storage, which lets tests model
/// several activations reading and writing one watch's storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes beyond `bytes` of total payload.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.inner.lock().quota = Some(bytes);
        store
    }

    /// Make every subsequent write to `key` fail (None to clear).
    pub fn fail_writes_to(&self, key: Option<PersistKey>) {
        self.inner.lock().failing_key = key;
    }
}

impl PersistentStore for MemoryStore {
    fn contains(&self, key: PersistKey) -> Result<bool, StorageError> {
        Ok(self.inner.lock().values.contains_key(&key))
    }

    fn read_int(&self, key: PersistKey) -> Result<Option<i32>, StorageError> {
        Ok(match self.inner.lock().values.get(&key) {
            Some(StoredValue::Int(v)) => Some(*v),
            _ => None,
        })
    }

    fn read_string(&self, key: PersistKey) -> Result<Option<String>, StorageError> {
        Ok(match self.inner.lock().values.get(&key) {
            Some(StoredValue::Text(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn write_int(&self, key: PersistKey, value: i32) -> Result<(), StorageError> {
        self.inner.lock().write(key, StoredValue::Int(value))
    }

    fn write_string(&self, key: PersistKey, value: &str) -> Result<(), StorageError> {
        self.inner.lock().write(key, StoredValue::Text(value.to_string()))
    }
}

/// SQLite-backed store used by the foreground and refresh activations.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS persist (
                key INTEGER PRIMARY KEY,
                int_value INTEGER,
                text_value TEXT,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn upsert(
        &self,
        key: PersistKey,
        int_value: Option<i32>,
        text_value: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO persist (key, int_value, text_value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![key, int_value, text_value, now],
        )?;
        Ok(())
    }
}

impl PersistentStore for SqliteStore {
    fn contains(&self, key: PersistKey) -> Result<bool, StorageError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM persist WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn read_int(&self, key: PersistKey) -> Result<Option<i32>, StorageError> {
        let value: Option<Option<i32>> = self
            .conn
            .query_row(
                "SELECT int_value FROM persist WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    fn read_string(&self, key: PersistKey) -> Result<Option<String>, StorageError> {
        let value: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT text_value FROM persist WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    fn write_int(&self, key: PersistKey, value: i32) -> Result<(), StorageError> {
        self.upsert(key, Some(value), None)
    }

    fn write_string(&self, key: PersistKey, value: &str) -> Result<(), StorageError> {
        self.upsert(key, None, Some(value))
    }
}
