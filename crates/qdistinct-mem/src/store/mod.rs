//! Ephemeral key-presence stores.
//!
//! DISTINCT creates one store per execution, asks it whether a key was seen,
//! records new keys, and destroys the whole store before returning. Stores are
//! never shared between executions.

mod memory;
mod storage_backed;

pub use memory::{MemoryKeyStore, MemoryStoreFactory};
pub use storage_backed::{StorageKeyStore, StorageStoreFactory};

use qdistinct_core::id::StoreId;
use qdistinct_core::types::{DistinctKey, Scalar};

use crate::error::Result;

/// Value DISTINCT records for a key it has let through.
pub fn presence_marker() -> Vec<Scalar> {
    vec![Scalar::Bool(true)]
}

/// One temporary associative store.
///
/// Invariants:
/// - After `drop_store` succeeds, `get`/`set` fail with `Error::StoreDropped`.
/// - `drop_store` is idempotent.
pub trait KeyStore: Send {
    fn id(&self) -> StoreId;

    /// Values recorded for `key`, or `None` if the key was never set.
    fn get(&self, key: &DistinctKey) -> Result<Option<Vec<Scalar>>>;

    /// Record `value` under `key`. Unique stores replace the previous value;
    /// non-unique stores append to it.
    fn set(&mut self, key: DistinctKey, value: Vec<Scalar>) -> Result<()>;

    /// Destroy every entry and release the backing resources.
    fn drop_store(&mut self) -> Result<()>;

    /// Number of distinct keys currently stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates fresh, empty stores.
pub trait KeyStoreFactory: Send + Sync {
    fn create(&self, unique: bool) -> Result<Box<dyn KeyStore>>;

    /// Stable backend name for explain/tracing.
    fn backend(&self) -> &'static str;
}

/// Merge a new value into an existing entry per the store's uniqueness.
pub(crate) fn merge_values(unique: bool, existing: Option<Vec<Scalar>>, value: Vec<Scalar>) -> Vec<Scalar> {
    match existing {
        Some(mut prev) if !unique => {
            prev.extend(value);
            prev
        }
        _ => value,
    }
}
