//! Storage adapters implementing `qdistinct_mem::Storage`.
//!
//! - `fs`: local filesystem (default).
//! - `memory://`: the in-process `MemoryStorage`.
//!
//! `build_storage_from_config` picks the backend from the configured spill URI.

mod fs;
pub use fs::FsStorage;

use std::sync::Arc;

use qdistinct_core::config::StorageConfig;
use qdistinct_mem::Storage;

use crate::error::{Error, Result};
use crate::memory_storage::MemoryStorage;

/// Build the correct storage backend using the provided configuration.
pub fn build_storage_from_config(cfg: &StorageConfig) -> Result<Arc<dyn Storage>> {
    match cfg.scheme() {
        Some("file") | None => {
            // Default to filesystem (treat URI as file:// or bare path).
            Ok(Arc::new(FsStorage::new()))
        }
        Some("memory") => Ok(Arc::new(MemoryStorage::new())),
        Some(other) => Err(Error::Config(format!("unsupported spill scheme '{other}'"))),
    }
}
