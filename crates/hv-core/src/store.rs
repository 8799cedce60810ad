//! The live allowlist store
//!
//! Exactly one snapshot is live at a time. Readers take a cheap
//! `Arc<DomainIndex>` clone and never observe a partial update: `replace`
//! builds the new index off to the side and swaps it in under a single
//! short write lock. Concurrent replaces are last-writer-wins, which is
//! sound because every sync produces a monotonic union over the same
//! bundled floor.
//!
//! Loading never fails. Whatever goes wrong with persisted state (read
//! error, malformed JSON, invariant violation), the store comes up on
//! bundled defaults and says so in the log (category only, no content).

use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::snapshot::{AllowlistSnapshot, DomainIndex};
use crate::storage::AllowlistStorage;

struct StoreState {
    snapshot: AllowlistSnapshot,
    index: Arc<DomainIndex>,
}

/// Owner of the live snapshot and its derived index.
pub struct AllowlistStore {
    state: RwLock<StoreState>,
}

impl AllowlistStore {
    /// A store running on the compiled-in defaults.
    pub fn from_bundled() -> Self {
        let snapshot = AllowlistSnapshot::bundled();
        let index = Arc::new(DomainIndex::build(&snapshot));
        Self {
            state: RwLock::new(StoreState { snapshot, index }),
        }
    }

    /// Load persisted state, falling back to bundled defaults on any
    /// storage error or invariant violation. Never fails.
    pub fn load(storage: &dyn AllowlistStorage) -> Self {
        let snapshot = match storage.load_snapshot() {
            Ok(Some(snapshot)) => match snapshot.validate() {
                Ok(()) => Some(snapshot),
                Err(e) => {
                    log::warn!("persisted allowlist rejected ({e}); using bundled defaults");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("allowlist load failed ({e}); using bundled defaults");
                None
            }
        };

        match snapshot {
            Some(snapshot) => {
                let index = Arc::new(DomainIndex::build(&snapshot));
                Self {
                    state: RwLock::new(StoreState { snapshot, index }),
                }
            }
            None => Self::from_bundled(),
        }
    }

    /// Swap in a new snapshot and persist it best-effort. The in-memory
    /// swap always wins; a failed persist is logged and dropped.
    pub fn replace(&self, snapshot: AllowlistSnapshot, storage: &dyn AllowlistStorage) {
        let index = Arc::new(DomainIndex::build(&snapshot));

        {
            let mut state = self.write_state();
            state.index = index;
            state.snapshot = snapshot.clone();
        }

        if let Err(e) = storage.save_snapshot(&snapshot) {
            log::warn!("allowlist persist failed ({e}); new snapshot is in memory only");
        }
    }

    /// Refresh the freshness stamp without touching the domain set
    /// (server said "not modified").
    pub fn touch(&self, storage: &dyn AllowlistStorage) {
        let snapshot = {
            let mut state = self.write_state();
            state.snapshot.last_updated = Utc::now();
            state.snapshot.clone()
        };

        if let Err(e) = storage.save_snapshot(&snapshot) {
            log::debug!("allowlist freshness persist failed ({e})");
        }
    }

    /// The active lookup index. O(1); the clone is a refcount bump.
    pub fn current_index(&self) -> Arc<DomainIndex> {
        self.read_state().index.clone()
    }

    /// Copy of the live snapshot (sync client needs version + domains).
    pub fn snapshot(&self) -> AllowlistSnapshot {
        self.read_state().snapshot.clone()
    }

    /// Version of the live snapshot. Diagnostic.
    pub fn version(&self) -> String {
        self.read_state().snapshot.version.clone()
    }

    /// Number of protected domains. Diagnostic; the contents themselves
    /// stay inside the engine.
    pub fn domain_count(&self) -> usize {
        self.read_state().index.len()
    }

    // A panic while a lock was held must not disable protection for the
    // rest of the process: recover the poisoned state, which is always a
    // fully-built snapshot/index pair.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
