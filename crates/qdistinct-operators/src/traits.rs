//! Plan trait + common interfaces.
//!
//! A consumer drives a plan with exactly one protocol per execution:
//! - push: `run(ctx, f)` calls `f` once per row until the input is exhausted
//!   or `f` returns `Ok(false)`;
//! - pull: `next(ctx)` returns one row per call and `Ok(None)` at the end.
//!
//! `use_next` tells the consumer which protocol the plan prefers.

use qdistinct_core::schema::Field;
use qdistinct_core::types::Row;

use thiserror::Error;

use crate::context::ExecContext;
use crate::explain::Formatter;
use crate::filter::Predicate;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("key store error: {0}")]
    Store(#[from] qdistinct_mem::error::Error),

    #[error(transparent)]
    Core(#[from] qdistinct_core::error::Error),

    #[error("execution cancelled")]
    Cancelled,

    #[error("plan is unusable after a failed materialization")]
    Poisoned,

    /// Normal end of input surfaced as an error value by some sources.
    #[error("end of stream")]
    EndOfStream,
}

impl PlanError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, PlanError::EndOfStream)
    }
}

/// Treat `PlanError::EndOfStream` as normal termination.
pub fn eof_as_ok(result: Result<(), PlanError>) -> Result<(), PlanError> {
    match result {
        Err(e) if e.is_end_of_stream() => Ok(()),
        other => other,
    }
}

/// Push-mode row callback. Returns whether the producer should continue.
pub type RowIterFn<'a> = dyn FnMut(Row) -> Result<bool, PlanError> + 'a;

/// Trait that all operators implement.
///
/// Invariants:
/// - `run` returns `Ok(())` both when the input is exhausted and when the
///   callback asked to stop; callback errors are returned unchanged.
/// - After `next` returns `Ok(None)`, further calls keep returning `Ok(None)`.
/// - Every row a plan emits has `result_fields().len()` values.
pub trait Plan: Send {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Write an explanation of this plan and everything below it.
    fn explain(&self, w: &mut dyn Formatter);

    /// Fields of emitted rows, hidden bookkeeping fields included.
    fn result_fields(&self) -> &[Field];

    /// Push-mode execution.
    fn run(&mut self, ctx: &ExecContext, f: &mut RowIterFn<'_>) -> Result<(), PlanError>;

    /// Pull-mode execution.
    fn next(&mut self, ctx: &ExecContext) -> Result<Option<Row>, PlanError>;

    /// Release resources held by this plan and its inputs.
    fn close(&mut self) -> Result<(), PlanError>;

    /// Offer a filter to this plan. Returns the (possibly rewritten) plan and
    /// whether the predicate was absorbed; if not, the caller must apply it
    /// above the returned plan.
    fn filter(
        self: Box<Self>,
        ctx: &ExecContext,
        predicate: &Predicate,
    ) -> Result<(Box<dyn Plan>, bool), PlanError>;

    /// Whether the consumer should prefer the pull protocol.
    fn use_next(&self) -> bool {
        false
    }
}
