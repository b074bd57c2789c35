//! Hash-map key store accounted against the hard memory budget.

use std::collections::HashMap;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};

use qdistinct_core::budget::{BudgetGuard, MemoryBudget};
use qdistinct_core::id::StoreId;
use qdistinct_core::types::{DistinctKey, Scalar};

use super::{merge_values, KeyStore, KeyStoreFactory};
use crate::error::{Error, Result};
use crate::guard::{BudgetGuardImpl, MemoryBudgetImpl};

const GUARD_TAG: &str = "distinct_keys";

/// Rough per-entry overhead of the hash map (buckets, Vec headers).
const ENTRY_OVERHEAD: usize = 48;

fn scalar_bytes(v: &Scalar) -> usize {
    size_of::<Scalar>()
        + match v {
            Scalar::Str(s) => s.len(),
            Scalar::Bin(b) => b.len(),
            _ => 0,
        }
}

fn entry_bytes(key: &DistinctKey, values: &[Scalar]) -> usize {
    ENTRY_OVERHEAD + key.as_bytes().len() + values.iter().map(scalar_bytes).sum::<usize>()
}

pub struct MemoryKeyStore {
    id: StoreId,
    unique: bool,
    entries: HashMap<DistinctKey, Vec<Scalar>>,
    budget: MemoryBudgetImpl,
    guard: BudgetGuardImpl,
    dropped: bool,
}

impl MemoryKeyStore {
    pub fn new(id: StoreId, unique: bool, budget: MemoryBudgetImpl) -> Result<Self> {
        let guard = budget
            .try_acquire(0, GUARD_TAG)
            .ok_or_else(|| Error::Budget("cannot create key store guard".into()))?;
        Ok(Self {
            id,
            unique,
            entries: HashMap::new(),
            budget,
            guard,
            dropped: false,
        })
    }

    /// Bytes this store currently holds against the budget.
    pub fn accounted_bytes(&self) -> usize {
        self.guard.bytes()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.dropped {
            Err(Error::StoreDropped(self.id))
        } else {
            Ok(())
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn id(&self) -> StoreId {
        self.id
    }

    fn get(&self, key: &DistinctKey) -> Result<Option<Vec<Scalar>>> {
        self.ensure_live()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: DistinctKey, value: Vec<Scalar>) -> Result<()> {
        self.ensure_live()?;

        let existing = self.entries.get(&key).cloned();
        let old_bytes = existing.as_deref().map(|v| entry_bytes(&key, v)).unwrap_or(0);
        let merged = merge_values(self.unique, existing, value);
        let new_bytes = entry_bytes(&key, &merged);

        if new_bytes > old_bytes {
            let delta = new_bytes - old_bytes;
            if !self.guard.try_grow(delta) {
                return Err(Error::BudgetExceeded {
                    tag: GUARD_TAG,
                    requested: delta,
                    capacity: self.budget.capacity_bytes(),
                    used: self.budget.used_bytes(),
                });
            }
        } else {
            self.guard.shrink(old_bytes - new_bytes);
        }

        self.entries.insert(key, merged);
        Ok(())
    }

    fn drop_store(&mut self) -> Result<()> {
        if self.dropped {
            return Ok(());
        }
        self.entries = HashMap::new();
        self.guard.release_all();
        self.dropped = true;

        #[cfg(feature = "tracing")]
        tracing::trace!(store = %self.id, "memory key store dropped");

        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Hands out memory stores that all share one budget.
pub struct MemoryStoreFactory {
    budget: MemoryBudgetImpl,
    next_id: AtomicU64,
}

impl MemoryStoreFactory {
    pub fn new(budget: MemoryBudgetImpl) -> Self {
        Self {
            budget,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }
}

impl KeyStoreFactory for MemoryStoreFactory {
    fn create(&self, unique: bool) -> Result<Box<dyn KeyStore>> {
        let id = StoreId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        #[cfg(feature = "tracing")]
        tracing::trace!(store = %id, unique, "memory key store created");

        Ok(Box::new(MemoryKeyStore::new(id, unique, self.budget.clone())?))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
