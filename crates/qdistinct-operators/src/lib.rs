#![forbid(unsafe_code)]
//! qdistinct-operators: composable plan operators (distinct/values/filter).
//!
//! Design intent:
//! - Every operator speaks both execution protocols through one `Plan` trait:
//!   push (`run` drives a callback) and pull (`next` returns one row).
//! - Operators wrap their upstream as `Box<dyn Plan>` so chains compose
//!   without knowing what sits below them.
//! - Anything that outlives a row (key stores) is created from the
//!   `ExecContext` and torn down before the call that created it returns.

pub mod context;
pub mod distinct;
pub mod explain;
pub mod filter;
pub mod select_list;
pub mod traits;
pub mod values;

pub use context::{CancelHandle, ExecContext};
pub use distinct::{DistinctPlan, DistinctStats};
pub use explain::Formatter;
pub use filter::{push_filter, CmpOp, FilterPlan, Predicate};
pub use select_list::SelectList;
pub use traits::{eof_as_ok, Plan, PlanError, RowIterFn};
pub use values::ValuesPlan;
