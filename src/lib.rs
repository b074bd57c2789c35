#![forbid(unsafe_code)]
//! qdistinct: DISTINCT over a key prefix with push and pull execution.
//!
//! Re-exports the workspace crates so integration tests and embedders can
//! depend on one package.

pub use qdistinct_core as core;
pub use qdistinct_exec as exec;
pub use qdistinct_io as io;
pub use qdistinct_mem as mem;
pub use qdistinct_operators as operators;

pub use qdistinct_exec::{ExecError, ExecMode, ExecOptions, Executor, ResultSet};
pub use qdistinct_operators::{DistinctPlan, ExecContext, Plan, PlanError, ValuesPlan};
