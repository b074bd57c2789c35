#![forbid(unsafe_code)]
//! qdistinct-exec: runs a plan tree to completion and collects its rows.
//!
//! The executor owns the key-store backend chosen by `ExecConfig`, picks the
//! push or pull protocol for each plan, and always closes the plan before
//! returning.

pub mod metrics;
pub mod runtime;

pub use runtime::{ExecError, ExecMode, ExecOptions, Executor, ResultSet};
