#![forbid(unsafe_code)]
//! qdistinct-core: values, rows, distinct keys, schema, configs, and hashing.
//!
//! This crate is pure data. Stores live in `qdistinct-mem`, storage adapters
//! in `qdistinct-io`, and the operators themselves in `qdistinct-operators`.

pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;

/// Version string reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
