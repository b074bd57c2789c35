//! In-memory storage backend.
//!
//! A HashMap-based `Storage` used for the `memory://` spill URI and in tests
//! to avoid file I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use qdistinct_mem::error::{Error as MemError, Result as MemResult};
use qdistinct_mem::Storage;

type Objects = HashMap<String, Vec<u8>>;

/// Thread-safe in-memory storage. Clones share the same objects.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<Objects>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MemResult<MutexGuard<'_, Objects>> {
        self.data
            .lock()
            .map_err(|_| MemError::Storage("memory storage lock poisoned".into()))
    }

    fn lock_or_recover(&self) -> MutexGuard<'_, Objects> {
        self.data.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Check if a path exists
    pub fn contains(&self, path: &str) -> bool {
        self.lock_or_recover().contains_key(path)
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.lock_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        self.lock()?.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> MemResult<Vec<u8>> {
        let data = self.lock()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {}", path)))?;

        let start = offset as usize;
        if start > bytes.len() {
            return Err(MemError::Storage(format!(
                "offset {} exceeds size {}",
                offset,
                bytes.len()
            )));
        }
        let end = start.saturating_add(len).min(bytes.len());

        Ok(bytes[start..end].to_vec())
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        self.lock()?.remove(path);
        Ok(())
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let data = self.lock()?;
        let mut result: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        result.sort();
        Ok(result)
    }

    fn size(&self, path: &str) -> MemResult<u64> {
        let data = self.lock()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {}", path)))?;
        Ok(bytes.len() as u64)
    }

    fn exists(&self, path: &str) -> MemResult<bool> {
        Ok(self.lock()?.contains_key(path))
    }
}
