#![forbid(unsafe_code)]
//! qdistinct-io: storage adapters plus the row readers/writers the CLI uses.
//!
//! - `storage`: `FsStorage` and backend selection from `StorageConfig`.
//! - `memory_storage`: in-process `MemoryStorage` for `memory://` and tests.
//! - `readers::csv` / `writers::jsonl`: row-at-a-time CSV in, NDJSON out.

pub mod error;
pub mod memory_storage;
pub mod readers;
pub mod storage;
pub mod writers;

pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use storage::{build_storage_from_config, FsStorage};
