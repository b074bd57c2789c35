#![forbid(unsafe_code)]
//! qdistinct-mem: hard memory budgeting and key-presence stores.
//!
//! This crate provides the concrete implementation of the budget *interfaces*
//! in `qdistinct-core::budget`, the `Storage` trait that `qdistinct-io`
//! implements, and the ephemeral key stores DISTINCT creates once per
//! execution.

pub mod error;
pub mod guard;
pub mod storage;
pub mod store;

pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use storage::Storage;
pub use store::{
    presence_marker, KeyStore, KeyStoreFactory, MemoryKeyStore, MemoryStoreFactory,
    StorageKeyStore, StorageStoreFactory,
};
