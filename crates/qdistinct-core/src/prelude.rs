//! Convenient re-exports for downstream crates.

pub use crate::config::{ExecConfig, KeyStoreKind, StorageConfig};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{StoreId, TempStoreName};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::{DistinctKey, Row, Scalar};
