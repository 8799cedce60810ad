//! File-backed storage for the CLI
//!
//! One JSON file per storage key under a state directory. Writes go to a
//! temp file first and are renamed into place, so a crash mid-write
//! leaves the previous state readable.

use std::fs;
use std::path::{Path, PathBuf};

use hv_core::queue::ImprovementQueue;
use hv_core::snapshot::AllowlistSnapshot;
use hv_core::storage::{AllowlistStorage, StorageError, QUEUE_KEY, SNAPSHOT_KEY};

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| StorageError::Read(e.to_string()))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(value)?;
        let path = self.path_for(key);
        write_atomic(&path, raw.as_bytes()).map_err(|e| StorageError::Write(e.to_string()))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

impl AllowlistStorage for FileStorage {
    fn load_snapshot(&self) -> Result<Option<AllowlistSnapshot>, StorageError> {
        self.read(SNAPSHOT_KEY)
    }

    fn save_snapshot(&self, snapshot: &AllowlistSnapshot) -> Result<(), StorageError> {
        self.write(SNAPSHOT_KEY, snapshot)
    }

    fn load_queue(&self) -> Result<Option<ImprovementQueue>, StorageError> {
        self.read(QUEUE_KEY)
    }

    fn save_queue(&self, queue: &ImprovementQueue) -> Result<(), StorageError> {
        self.write(QUEUE_KEY, queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hv_core::store::AllowlistStore;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(storage.load_snapshot().unwrap().is_none());

        let snapshot = AllowlistSnapshot::bundled();
        storage.save_snapshot(&snapshot).unwrap();
        assert_eq!(storage.load_snapshot().unwrap().unwrap(), snapshot);

        // No stray temp file left behind.
        assert!(!dir.path().join(format!("{SNAPSHOT_KEY}.json.tmp")).exists());
    }

    #[test]
    fn test_store_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let store = AllowlistStore::load(&storage);
        store.replace(
            AllowlistSnapshot::merged("v2", ["example-helpline.org"]),
            &storage,
        );

        let reloaded = AllowlistStore::load(&storage);
        assert_eq!(reloaded.version(), "v2");
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        fs::write(storage.path_for(SNAPSHOT_KEY), "{broken").unwrap();

        assert!(matches!(
            storage.load_snapshot(),
            Err(StorageError::Malformed(_))
        ));
    }
}
