//! Runtime: drive a plan tree to completion and collect its rows.
//!
//! - Builds the key-store factory from `ExecConfig` (memory or storage).
//! - Uses the pull protocol when the plan prefers it, push otherwise, unless
//!   the caller forces one.
//! - Always closes the plan; a close error is reported only when execution
//!   itself succeeded.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use qdistinct_core::config::{ExecConfig, KeyStoreKind};
use qdistinct_core::schema::Field;
use qdistinct_core::types::Row;

use qdistinct_mem::{KeyStoreFactory, MemoryBudgetImpl, MemoryStoreFactory, StorageStoreFactory};

use qdistinct_io::build_storage_from_config;

use qdistinct_operators::{eof_as_ok, CancelHandle, ExecContext, Plan, PlanError};

use crate::metrics::emit_span;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("plan: {0}")]
    Plan(#[from] PlanError),
    #[error("config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(#[from] qdistinct_io::Error),
}

/// Which protocol drives the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Ask the plan (`Plan::use_next`).
    #[default]
    Auto,
    Push,
    Pull,
}

impl ExecMode {
    fn resolve(self, plan: &dyn Plan) -> ExecMode {
        match self {
            ExecMode::Auto if plan.use_next() => ExecMode::Pull,
            ExecMode::Auto => ExecMode::Push,
            forced => forced,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ExecMode::Auto => "auto",
            ExecMode::Push => "push",
            ExecMode::Pull => "pull",
        }
    }
}

impl FromStr for ExecMode {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ExecMode::Auto),
            "push" => Ok(ExecMode::Push),
            "pull" | "next" => Ok(ExecMode::Pull),
            other => Err(ExecError::Config(format!("unknown exec mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub mode: ExecMode,
    /// Stop after this many output rows.
    pub limit: Option<usize>,
}

/// Rows produced by one execution, with the plan's output fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executor owns the key-store backend and the cancellation flag shared by
/// every plan it runs.
pub struct Executor {
    cfg: ExecConfig,
    budget: Option<MemoryBudgetImpl>,
    ctx: ExecContext,
}

impl Executor {
    pub fn new(cfg: ExecConfig) -> Result<Self, ExecError> {
        let (factory, budget): (Arc<dyn KeyStoreFactory>, Option<MemoryBudgetImpl>) =
            match cfg.key_store {
                KeyStoreKind::Memory => {
                    let budget = MemoryBudgetImpl::new(cfg.mem_cap_bytes);
                    (
                        Arc::new(MemoryStoreFactory::new(budget.clone())),
                        Some(budget),
                    )
                }
                KeyStoreKind::Storage => {
                    let storage_cfg = cfg.storage_config();
                    let storage = build_storage_from_config(&storage_cfg)?;
                    (
                        Arc::new(StorageStoreFactory::new(storage, storage_cfg.root)),
                        None,
                    )
                }
            };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            backend = factory.backend(),
            mem_cap_bytes = cfg.mem_cap_bytes,
            "executor ready"
        );

        Ok(Self {
            cfg,
            budget,
            ctx: ExecContext::new(factory),
        })
    }

    /// Executor over a caller-supplied store factory.
    pub fn with_store_factory(cfg: ExecConfig, factory: Arc<dyn KeyStoreFactory>) -> Self {
        Self {
            cfg,
            budget: None,
            ctx: ExecContext::new(factory),
        }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.cfg
    }

    pub fn context(&self) -> &ExecContext {
        &self.ctx
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.ctx.cancel_handle()
    }

    /// Highest number of key-store bytes held at once, for memory stores.
    pub fn peak_memory_bytes(&self) -> Option<usize> {
        self.budget.as_ref().map(MemoryBudgetImpl::peak_bytes)
    }

    /// Render the plan tree, leaf first.
    pub fn explain(&self, plan: &dyn Plan) -> String {
        let mut text = String::new();
        plan.explain(&mut text);
        text
    }

    /// Run `plan` and collect every output row.
    pub fn execute(&self, plan: &mut dyn Plan, opts: &ExecOptions) -> Result<ResultSet, ExecError> {
        let mut rows = Vec::new();
        self.stream(plan, opts, &mut |row: Row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(ResultSet {
            fields: plan.result_fields().to_vec(),
            rows,
        })
    }

    /// Run `plan`, handing each output row to `sink`. Returns the row count.
    pub fn stream(
        &self,
        plan: &mut dyn Plan,
        opts: &ExecOptions,
        sink: &mut dyn FnMut(Row) -> Result<(), PlanError>,
    ) -> Result<usize, ExecError> {
        let mode = opts.mode.resolve(plan);
        let started = Instant::now();

        let driven = match (mode, opts.limit) {
            (_, Some(0)) => Ok(0),
            (ExecMode::Pull, limit) => self.drive_pull(plan, limit, sink),
            (_, limit) => self.drive_push(plan, limit, sink),
        };
        let closed = plan.close();

        let emitted = match driven {
            Err(e) => return Err(e.into()),
            Ok(n) => {
                closed?;
                n
            }
        };

        emit_span(
            "execute",
            &[
                ("plan", plan.name().to_string()),
                ("mode", mode.as_str().to_string()),
                ("rows", emitted.to_string()),
                ("elapsed_us", started.elapsed().as_micros().to_string()),
            ],
        );

        Ok(emitted)
    }

    fn drive_push(
        &self,
        plan: &mut dyn Plan,
        limit: Option<usize>,
        sink: &mut dyn FnMut(Row) -> Result<(), PlanError>,
    ) -> Result<usize, PlanError> {
        let mut emitted = 0usize;
        let result = plan.run(&self.ctx, &mut |row: Row| {
            sink(row)?;
            emitted += 1;
            Ok(limit.map_or(true, |n| emitted < n))
        });
        eof_as_ok(result)?;
        Ok(emitted)
    }

    fn drive_pull(
        &self,
        plan: &mut dyn Plan,
        limit: Option<usize>,
        sink: &mut dyn FnMut(Row) -> Result<(), PlanError>,
    ) -> Result<usize, PlanError> {
        let mut emitted = 0usize;
        while limit.map_or(true, |n| emitted < n) {
            match plan.next(&self.ctx) {
                Ok(Some(row)) => {
                    sink(row)?;
                    emitted += 1;
                }
                Ok(None) => break,
                Err(e) if e.is_end_of_stream() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(emitted)
    }
}
