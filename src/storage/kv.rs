use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{KeyValueStorage, StorageError};

/// Process-local key-value area. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    map: Arc<RwLock<StdHashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// Key-value area persisted as a single JSON object file.
///
/// Every mutation rewrites the whole file through `<file>.tmp` + rename so a crash
/// mid-write leaves either the old or the new content on disk. The lock serialises
/// writers inside this process; other processes are not coordinated.
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
    lock: Arc<parking_lot::Mutex<()>>,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Arc::new(parking_lot::Mutex::new(())) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf { self.path.with_extension("json.tmp") }

    fn read_all(&self) -> Result<StdHashMap<String, String>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StdHashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(StdHashMap::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_all(&self, map: &StdHashMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(target: "storage", "kv.write path={} keys={}", self.path.display(), map.len());
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _g = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock();
        // a corrupt file is replaced rather than blocking every future write
        let mut map = self.read_all().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock();
        let mut map = self.read_all().unwrap_or_default();
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&map)
    }
}
