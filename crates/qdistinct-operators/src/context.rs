//! Per-query execution context shared by every operator of one plan tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use qdistinct_mem::{KeyStoreFactory, MemoryBudgetImpl, MemoryStoreFactory};

use crate::traits::PlanError;

/// Where operators get their temporary stores, and how they learn that the
/// consumer gave up.
#[derive(Clone)]
pub struct ExecContext {
    store_factory: Arc<dyn KeyStoreFactory>,
    cancelled: Arc<AtomicBool>,
}

impl ExecContext {
    pub fn new(store_factory: Arc<dyn KeyStoreFactory>) -> Self {
        Self {
            store_factory,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context with memory-backed key stores capped at `mem_cap_bytes`.
    pub fn in_memory(mem_cap_bytes: usize) -> Self {
        let budget = MemoryBudgetImpl::new(mem_cap_bytes);
        Self::new(Arc::new(MemoryStoreFactory::new(budget)))
    }

    pub fn store_factory(&self) -> &dyn KeyStoreFactory {
        self.store_factory.as_ref()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(PlanError::Cancelled)` once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), PlanError> {
        if self.is_cancelled() {
            Err(PlanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Requests cooperative cancellation of every operator using the context.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}
