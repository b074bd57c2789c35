use qdistinct_core::id::StoreId;
use thiserror::Error;

/// Result type local to qdistinct-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("memory budget error: {0}")]
    Budget(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("key store {0} was already dropped")]
    StoreDropped(StoreId),

    #[error("codec error: {0}")]
    Codec(String),
}
