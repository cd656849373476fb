//! Local persistence of the library.
//!
//! The core only needs a string key-value store. [`LocalStore`] keeps the whole
//! collection under one key and the last import time under another.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::library::{Book, RawBook, normalize};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Minimal key-value persistence the library needs from its host.
///
/// `set` must be atomic per key: on failure the previous value is retained.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keys the library state lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    /// Key of the serialized book collection.
    pub books: String,
    /// Key of the last successful import timestamp.
    pub last_sync: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for StoreKeys {
    fn from(config: &StoreConfig) -> Self {
        Self {
            books: config.books_key.clone(),
            last_sync: config.last_sync_key.clone(),
        }
    }
}

struct PendingWrite {
    key: String,
    value: String,
}

struct BackgroundWriter {
    tx: mpsc::UnboundedSender<PendingWrite>,
    task: JoinHandle<()>,
}

/// Library persistence on top of a [`KeyValueStore`].
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
    keys: StoreKeys,
    writer: Option<BackgroundWriter>,
}

impl LocalStore {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn KeyValueStore>, keys: StoreKeys) -> Self {
        Self {
            backend,
            keys,
            writer: None,
        }
    }

    /// Open the SQLite store described by the configuration.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let backend = SqliteStore::open(&config.path)?;
        tracing::info!(path = %config.path.display(), "Opened local store");
        Ok(Self::new(Arc::new(backend), StoreKeys::from(config)))
    }

    /// Ephemeral in-memory store with the default keys.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), StoreKeys::default())
    }

    /// Underlying key-value backend.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Keys in use.
    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Load the saved library.
    ///
    /// Missing, unreadable or corrupt data yields an empty library. Reads go
    /// straight to the backend, so call this before queueing writes.
    pub fn load_books(&self) -> Vec<Book> {
        let raw = match self.backend.get(&self.keys.books) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved library, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<RawBook>>(&raw) {
            Ok(records) => {
                let now = Utc::now();
                records.into_iter().map(|r| normalize(r, now)).collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Saved library is corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Persist the whole collection.
    pub fn save_books(&self, books: &[Book]) -> Result<()> {
        let value = serde_json::to_string(books)?;
        self.write(&self.keys.books, value)
    }

    /// Time of the last successful import, if any.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        let raw = match self.backend.get(&self.keys.last_sync) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read last sync time");
                return None;
            }
        };

        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Record a successful import.
    pub fn set_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.write(&self.keys.last_sync, at.to_rfc3339())
    }

    /// Move writes to a background task.
    ///
    /// From then on every write returns immediately and is applied by a single
    /// task in submission order, so the last write always wins. Does nothing
    /// and returns `false` if a writer is already running. Must be called
    /// inside a tokio runtime.
    pub fn spawn_writer(&mut self) -> bool {
        if self.writer.is_some() {
            return false;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<PendingWrite>();
        let backend = Arc::clone(&self.backend);
        let task = tokio::spawn(async move {
            while let Some(write) = rx.recv().await {
                if let Err(e) = backend.set(&write.key, &write.value) {
                    tracing::error!(key = %write.key, error = %e, "Background store write failed");
                }
            }
            tracing::debug!("Store writer stopped");
        });

        self.writer = Some(BackgroundWriter { tx, task });
        true
    }

    /// Whether writes currently go through the background task.
    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Go back to synchronous writes.
    ///
    /// Resolves once every queued write has been applied, so a write issued
    /// afterwards always lands last.
    pub async fn stop_writer(&mut self) {
        let Some(BackgroundWriter { tx, task }) = self.writer.take() else {
            return;
        };
        drop(tx);

        if let Err(e) = task.await {
            tracing::error!(error = %e, "Store writer task failed");
        }
    }

    fn write(&self, key: &str, value: String) -> Result<()> {
        match &self.writer {
            Some(writer) => writer
                .tx
                .send(PendingWrite {
                    key: key.to_string(),
                    value,
                })
                .map_err(|_| AppError::Store("Store writer has stopped".to_string())),
            None => self.backend.set(key, &value),
        }
    }
}
