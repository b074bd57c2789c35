//! Key store that keeps one small JSON entry per key on a `Storage` backend.
//!
//! Layout: `{root}/keystore-{uuid}/{digest}.key`. The digest is BLAKE3 over
//! the encoded key; the entry repeats the full key so a digest collision is
//! detected instead of silently merging two groups.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use qdistinct_core::id::{StoreId, TempStoreName};
use qdistinct_core::types::{DistinctKey, Scalar};

use super::{merge_values, KeyStore, KeyStoreFactory};
use crate::error::{Error, Result};
use crate::storage::Storage;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: DistinctKey,
    values: Vec<Scalar>,
}

pub struct StorageKeyStore {
    id: StoreId,
    unique: bool,
    storage: Arc<dyn Storage>,
    prefix: String,
    len: usize,
    dropped: bool,
}

impl StorageKeyStore {
    pub fn new(id: StoreId, unique: bool, storage: Arc<dyn Storage>, root: &str) -> Self {
        let prefix = format!("{}/{}", root.trim_end_matches('/'), TempStoreName::random());
        Self {
            id,
            unique,
            storage,
            prefix,
            len: 0,
            dropped: false,
        }
    }

    /// Directory (or object prefix) holding this store's entries.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn entry_path(&self, key: &DistinctKey) -> String {
        format!("{}/{}.key", self.prefix, key.digest().to_hex())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.dropped {
            Err(Error::StoreDropped(self.id))
        } else {
            Ok(())
        }
    }

    fn read_entry(&self, key: &DistinctKey) -> Result<Option<StoredEntry>> {
        let path = self.entry_path(key);
        if !self.storage.exists(&path)? {
            return Ok(None);
        }
        let bytes = self.storage.read_all(&path)?;
        let entry: StoredEntry = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Codec(format!("key entry {path}: {e}")))?;
        if entry.key != *key {
            return Err(Error::Storage(format!("key digest collision at {path}")));
        }
        Ok(Some(entry))
    }
}

impl KeyStore for StorageKeyStore {
    fn id(&self) -> StoreId {
        self.id
    }

    fn get(&self, key: &DistinctKey) -> Result<Option<Vec<Scalar>>> {
        self.ensure_live()?;
        Ok(self.read_entry(key)?.map(|e| e.values))
    }

    fn set(&mut self, key: DistinctKey, value: Vec<Scalar>) -> Result<()> {
        self.ensure_live()?;

        let existing = self.read_entry(&key)?.map(|e| e.values);
        let is_new = existing.is_none();
        let values = merge_values(self.unique, existing, value);

        let path = self.entry_path(&key);
        let bytes = serde_json::to_vec(&StoredEntry { key, values })
            .map_err(|e| Error::Codec(format!("key entry {path}: {e}")))?;
        self.storage.write(&path, &bytes)?;

        if is_new {
            self.len += 1;
        }
        Ok(())
    }

    fn drop_store(&mut self) -> Result<()> {
        if self.dropped {
            return Ok(());
        }
        self.storage.delete_prefix(&self.prefix)?;
        self.dropped = true;
        self.len = 0;

        #[cfg(feature = "tracing")]
        tracing::trace!(store = %self.id, prefix = %self.prefix, "storage key store dropped");

        Ok(())
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Hands out storage-backed stores rooted at one spill location.
pub struct StorageStoreFactory {
    storage: Arc<dyn Storage>,
    root: String,
    next_id: AtomicU64,
}

impl StorageStoreFactory {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl KeyStoreFactory for StorageStoreFactory {
    fn create(&self, unique: bool) -> Result<Box<dyn KeyStore>> {
        let id = StoreId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let store = StorageKeyStore::new(id, unique, Arc::clone(&self.storage), &self.root);

        #[cfg(feature = "tracing")]
        tracing::trace!(store = %id, prefix = %store.prefix(), unique, "storage key store created");

        Ok(Box::new(store))
    }

    fn backend(&self) -> &'static str {
        "storage"
    }
}
