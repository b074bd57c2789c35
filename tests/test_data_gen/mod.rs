//! Shared fixtures for the integration tests: row generators, a scripted
//! upstream plan, and a key-store factory with injectable failures.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qdistinct_core::prelude::{DataType, DistinctKey, Field, Row, Scalar, StoreId};
use qdistinct_mem::error::{Error as MemError, Result as MemResult};
use qdistinct_mem::{KeyStore, KeyStoreFactory, MemoryBudgetImpl, MemoryStoreFactory};
use qdistinct_operators::{ExecContext, Formatter, Plan, PlanError, Predicate, RowIterFn};

/// Unique scratch directory under the system temp dir.
pub fn create_temp_spill_dir(name: &str) -> String {
    let mut dir = std::env::temp_dir();
    dir.push(format!("qdistinct-test-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.to_string_lossy().to_string()
}

/// `(key, _seq)` fields: one visible key column and a hidden sequence number.
pub fn keyed_fields() -> Vec<Field> {
    vec![
        Field::new("key", DataType::Int64, false),
        Field::new("_seq", DataType::Int64, false),
    ]
}

/// One row per key, tagged with its input position.
pub fn keyed_rows(keys: &[i64]) -> Vec<Row> {
    keys.iter()
        .enumerate()
        .map(|(i, k)| Row::new(vec![Scalar::I64(*k), Scalar::I64(i as i64)]))
        .collect()
}

/// Deterministic pseudo-random keys in `0..distinct`.
pub fn generate_keys(n: usize, distinct: u64, seed: u64) -> Vec<i64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % distinct) as i64
        })
        .collect()
}

/// Reference result: first row of each key, in input order.
pub fn first_occurrences(rows: &[Row], offset: usize) -> Vec<Row> {
    let mut seen = Vec::<Vec<Scalar>>::new();
    let mut out = Vec::new();
    for row in rows {
        let key = row.data[..offset].to_vec();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(row.clone());
        }
    }
    out
}

/// How a `ScriptedPlan` stops early.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Upstream,
    EndOfStream,
}

impl Failure {
    fn to_error(self) -> PlanError {
        match self {
            Failure::Upstream => PlanError::Upstream("scripted upstream failure".into()),
            Failure::EndOfStream => PlanError::EndOfStream,
        }
    }
}

/// Upstream that yields fixed rows and can fail at a chosen position.
pub struct ScriptedPlan {
    fields: Vec<Field>,
    rows: Vec<Row>,
    fail_at: Option<(usize, Failure)>,
    prefer_next: bool,
    failing_close: bool,
    cursor: usize,
    pub closes: Arc<AtomicUsize>,
    pub rows_handed_out: Arc<AtomicUsize>,
}

impl ScriptedPlan {
    pub fn new(fields: Vec<Field>, rows: Vec<Row>) -> Self {
        Self {
            fields,
            rows,
            fail_at: None,
            prefer_next: false,
            failing_close: false,
            cursor: 0,
            closes: Arc::new(AtomicUsize::new(0)),
            rows_handed_out: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn keyed(keys: &[i64]) -> Self {
        Self::new(keyed_fields(), keyed_rows(keys))
    }

    /// Fail instead of producing row `index` (or at the end if `index` equals
    /// the row count).
    pub fn fail_at(mut self, index: usize, failure: Failure) -> Self {
        self.fail_at = Some((index, failure));
        self
    }

    pub fn with_use_next(mut self, prefer_next: bool) -> Self {
        self.prefer_next = prefer_next;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    fn failure_at(&self, index: usize) -> Option<PlanError> {
        match self.fail_at {
            Some((at, failure)) if at == index => Some(failure.to_error()),
            _ => None,
        }
    }
}

impl Plan for ScriptedPlan {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn explain(&self, w: &mut dyn Formatter) {
        w.format(&format!("┌Scripted {} rows\n", self.rows.len()));
    }

    fn result_fields(&self) -> &[Field] {
        &self.fields
    }

    fn run(&mut self, ctx: &ExecContext, f: &mut RowIterFn<'_>) -> Result<(), PlanError> {
        for i in 0..=self.rows.len() {
            if let Some(e) = self.failure_at(i) {
                return Err(e);
            }
            let Some(row) = self.rows.get(i) else {
                break;
            };
            ctx.check_cancelled()?;
            self.rows_handed_out.fetch_add(1, Ordering::SeqCst);
            if !f(row.clone())? {
                break;
            }
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecContext) -> Result<Option<Row>, PlanError> {
        ctx.check_cancelled()?;
        if let Some(e) = self.failure_at(self.cursor) {
            return Err(e);
        }
        let row = self.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
            self.rows_handed_out.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<(), PlanError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.failing_close {
            Err(PlanError::Exec("scripted close failure".into()))
        } else {
            Ok(())
        }
    }

    fn filter(
        self: Box<Self>,
        _ctx: &ExecContext,
        _predicate: &Predicate,
    ) -> Result<(Box<dyn Plan>, bool), PlanError> {
        let plan: Box<dyn Plan> = self;
        Ok((plan, false))
    }

    fn use_next(&self) -> bool {
        self.prefer_next
    }
}

/// Which store operation should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreFaults {
    pub fail_get: bool,
    pub fail_set: bool,
    pub fail_drop: bool,
}

/// Memory-backed factory that counts store lifecycles and injects faults.
pub struct FlakyStoreFactory {
    inner: MemoryStoreFactory,
    faults: StoreFaults,
    pub created: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicUsize>,
}

impl FlakyStoreFactory {
    pub fn new(faults: StoreFaults) -> Self {
        Self {
            inner: MemoryStoreFactory::new(MemoryBudgetImpl::new(16 * 1024 * 1024)),
            faults,
            created: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl KeyStoreFactory for FlakyStoreFactory {
    fn create(&self, unique: bool) -> MemResult<Box<dyn KeyStore>> {
        let inner = self.inner.create(unique)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FlakyStore {
            inner,
            faults: self.faults,
            dropped: Arc::clone(&self.dropped),
        }))
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

struct FlakyStore {
    inner: Box<dyn KeyStore>,
    faults: StoreFaults,
    dropped: Arc<AtomicUsize>,
}

impl KeyStore for FlakyStore {
    fn id(&self) -> StoreId {
        self.inner.id()
    }

    fn get(&self, key: &DistinctKey) -> MemResult<Option<Vec<Scalar>>> {
        if self.faults.fail_get {
            return Err(MemError::Storage("injected get failure".into()));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: DistinctKey, value: Vec<Scalar>) -> MemResult<()> {
        if self.faults.fail_set {
            return Err(MemError::Storage("injected set failure".into()));
        }
        self.inner.set(key, value)
    }

    fn drop_store(&mut self) -> MemResult<()> {
        self.dropped.fetch_add(1, Ordering::SeqCst);
        self.inner.drop_store()?;
        if self.faults.fail_drop {
            return Err(MemError::Storage("injected drop failure".into()));
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

pub fn flaky_context(faults: StoreFaults) -> (ExecContext, Arc<FlakyStoreFactory>) {
    let factory = Arc::new(FlakyStoreFactory::new(faults));
    let ctx = ExecContext::new(Arc::clone(&factory) as Arc<dyn KeyStoreFactory>);
    (ctx, factory)
}
