//! Persistence boundary
//!
//! The engine persists two values: the allowlist snapshot and the
//! improvement queue. Where they live is the host's business (the
//! extension uses `chrome.storage` through the wasm bindings, the CLI
//! uses JSON files), so the engine only sees this trait.
//!
//! Storage failure is always recoverable here: a failed load degrades to
//! bundled defaults, a failed save is logged and dropped. Nothing in this
//! module may take down the decision path.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::queue::ImprovementQueue;
use crate::snapshot::AllowlistSnapshot;

/// Storage key for the persisted allowlist snapshot.
pub const SNAPSHOT_KEY: &str = "crisisAllowlist";

/// Storage key for the persisted improvement queue.
pub const QUEUE_KEY: &str = "fuzzyMatchQueue";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("stored value is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Backing store for the snapshot and the improvement queue.
///
/// `load_*` returns `Ok(None)` when the key has never been written.
pub trait AllowlistStorage: Send + Sync {
    fn load_snapshot(&self) -> Result<Option<AllowlistSnapshot>, StorageError>;
    fn save_snapshot(&self, snapshot: &AllowlistSnapshot) -> Result<(), StorageError>;
    fn load_queue(&self) -> Result<Option<ImprovementQueue>, StorageError>;
    fn save_queue(&self, queue: &ImprovementQueue) -> Result<(), StorageError>;
}

// =============================================================================
// In-Memory Storage
// =============================================================================

/// Key/value storage holding serialized JSON, the same shape the
/// extension host's storage area has. Used by tests and by hosts that do
/// their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StorageError::Read(e.to_string()))?;
        match values.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn put<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        let mut values = self
            .values
            .lock()
            .map_err(|e| StorageError::Write(e.to_string()))?;
        values.insert(key.to_string(), raw);
        Ok(())
    }

    /// Raw JSON under a key, for hosts that persist the values themselves.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    /// Seed a key with raw JSON, e.g. state handed back by the host.
    pub fn set_raw(&self, key: &str, raw: String) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), raw);
        }
    }
}

impl AllowlistStorage for MemoryStorage {
    fn load_snapshot(&self) -> Result<Option<AllowlistSnapshot>, StorageError> {
        self.get(SNAPSHOT_KEY)
    }

    fn save_snapshot(&self, snapshot: &AllowlistSnapshot) -> Result<(), StorageError> {
        self.put(SNAPSHOT_KEY, snapshot)
    }

    fn load_queue(&self) -> Result<Option<ImprovementQueue>, StorageError> {
        self.get(QUEUE_KEY)
    }

    fn save_queue(&self, queue: &ImprovementQueue) -> Result<(), StorageError> {
        self.put(QUEUE_KEY, queue)
    }
}
