//! DISTINCT over a fixed key prefix.
//!
//! Rows are grouped by their visible prefix `row[0..hidden_field_offset]`;
//! the first row of each group passes, later ones are dropped. Which keys
//! were already seen is tracked in a key store that lives exactly as long as
//! one `run` call or one pull-mode materialization pass.

use serde::{Deserialize, Serialize};

use qdistinct_core::schema::Field;
use qdistinct_core::types::Row;
use qdistinct_mem::{presence_marker, KeyStore};

use crate::context::ExecContext;
use crate::explain::{field_names, Formatter};
use crate::filter::Predicate;
use crate::select_list::SelectList;
use crate::traits::{eof_as_ok, Plan, PlanError, RowIterFn};

/// Counters for the most recent execution of a `DistinctPlan`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinctStats {
    pub rows_in: u64,
    pub rows_out: u64,
    pub duplicates: u64,
}

/// Key-prefix presence check shared by both protocols.
struct KeyFilter<'s> {
    store: &'s mut dyn KeyStore,
    hidden_field_offset: usize,
    stats: DistinctStats,
}

impl<'s> KeyFilter<'s> {
    fn new(store: &'s mut dyn KeyStore, hidden_field_offset: usize) -> Self {
        Self {
            store,
            hidden_field_offset,
            stats: DistinctStats::default(),
        }
    }

    /// True if `row` is the first of its group; records its key if so.
    fn admit(&mut self, row: &Row) -> Result<bool, PlanError> {
        self.stats.rows_in += 1;
        let key = row.distinct_key(self.hidden_field_offset)?;

        let seen = self.store.get(&key)?.is_some_and(|v| !v.is_empty());
        if seen {
            self.stats.duplicates += 1;
            return Ok(false);
        }

        self.store.set(key, presence_marker())?;
        self.stats.rows_out += 1;
        Ok(true)
    }
}

/// Owns a key store for one dynamic extent.
///
/// `release` destroys the store and reports the outcome. If the guard is
/// dropped without `release` (unwinding), the store is still destroyed and
/// the outcome ignored.
struct ScopedKeyStore {
    store: Box<dyn KeyStore>,
    released: bool,
}

impl ScopedKeyStore {
    fn acquire(ctx: &ExecContext) -> Result<Self, PlanError> {
        Ok(Self {
            store: ctx.store_factory().create(true)?,
            released: false,
        })
    }

    fn store_mut(&mut self) -> &mut dyn KeyStore {
        self.store.as_mut()
    }

    fn release(mut self) -> Result<(), PlanError> {
        self.released = true;
        self.store.drop_store()?;
        Ok(())
    }
}

impl Drop for ScopedKeyStore {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.store.drop_store();
        }
    }
}

/// Run `body` with a fresh key store and destroy the store afterwards.
///
/// An error from `body` wins over a destroy error; a destroy error after a
/// successful `body` is returned instead of the value.
fn with_key_store<T>(
    ctx: &ExecContext,
    body: impl FnOnce(&mut dyn KeyStore) -> Result<T, PlanError>,
) -> Result<T, PlanError> {
    let mut scoped = ScopedKeyStore::acquire(ctx)?;
    let result = body(scoped.store_mut());
    let released = scoped.release();
    match result {
        Err(e) => Err(e),
        Ok(v) => released.map(|()| v),
    }
}

/// Pull-mode materialization state.
enum Materialized {
    Pending,
    Ready { rows: Vec<Row>, cursor: usize },
    Poisoned,
}

/// DISTINCT plan, e.g. `SELECT DISTINCT id FROM t`.
pub struct DistinctPlan {
    select_list: SelectList,
    src: Box<dyn Plan>,
    state: Materialized,
    stats: DistinctStats,
}

impl DistinctPlan {
    /// Deduplicate `src` on its first `hidden_field_offset` fields.
    pub fn new(src: Box<dyn Plan>, hidden_field_offset: usize) -> Result<Self, PlanError> {
        let select_list = SelectList::new(src.result_fields().to_vec(), hidden_field_offset)?;
        Ok(Self {
            select_list,
            src,
            state: Materialized::Pending,
            stats: DistinctStats::default(),
        })
    }

    pub fn hidden_field_offset(&self) -> usize {
        self.select_list.hidden_field_offset
    }

    /// Counters of the last `run` or materialization pass.
    pub fn stats(&self) -> DistinctStats {
        self.stats
    }

    /// Pull every upstream row once and keep the first row of each group.
    fn fetch_all(&mut self, ctx: &ExecContext) -> Result<Vec<Row>, PlanError> {
        let offset = self.select_list.hidden_field_offset;
        let src = &mut self.src;
        let mut stats = DistinctStats::default();

        let result = with_key_store(ctx, |store| {
            let mut keys = KeyFilter::new(store, offset);
            let mut rows = Vec::new();
            let outcome = loop {
                if let Err(e) = ctx.check_cancelled() {
                    break Err(e);
                }
                match src.next(ctx) {
                    Ok(Some(row)) => match keys.admit(&row) {
                        Ok(true) => rows.push(row),
                        Ok(false) => {}
                        Err(e) => break Err(e),
                    },
                    Ok(None) => break Ok(()),
                    Err(e) if e.is_end_of_stream() => break Ok(()),
                    Err(e) => break Err(e),
                }
            };
            stats = keys.stats;
            outcome.map(|()| rows)
        });

        self.stats = stats;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rows_in = stats.rows_in,
            rows_out = stats.rows_out,
            duplicates = stats.duplicates,
            ok = result.is_ok(),
            "distinct materialized"
        );

        result
    }
}

impl Plan for DistinctPlan {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn explain(&self, w: &mut dyn Formatter) {
        self.src.explain(w);
        w.format(&format!(
            "┌Compute distinct rows\n└Output field names {}\n",
            field_names(self.select_list.visible_fields())
        ));
    }

    fn result_fields(&self) -> &[Field] {
        &self.select_list.result_fields
    }

    fn run(&mut self, ctx: &ExecContext, f: &mut RowIterFn<'_>) -> Result<(), PlanError> {
        let offset = self.select_list.hidden_field_offset;
        let src = &mut self.src;
        let mut stats = DistinctStats::default();

        // First occurrences go downstream as soon as they are seen; a stop
        // from downstream is passed back up so the input stops too.
        let result = with_key_store(ctx, |store| {
            let mut keys = KeyFilter::new(store, offset);
            let upstream = src.run(ctx, &mut |row: Row| {
                ctx.check_cancelled()?;
                if !keys.admit(&row)? {
                    return Ok(true);
                }
                f(row)
            });
            stats = keys.stats;
            eof_as_ok(upstream)
        });

        self.stats = stats;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rows_in = stats.rows_in,
            rows_out = stats.rows_out,
            duplicates = stats.duplicates,
            ok = result.is_ok(),
            "distinct run finished"
        );

        result
    }

    fn next(&mut self, ctx: &ExecContext) -> Result<Option<Row>, PlanError> {
        if matches!(self.state, Materialized::Pending) {
            self.state = match self.fetch_all(ctx) {
                Ok(rows) => Materialized::Ready { rows, cursor: 0 },
                Err(e) => {
                    self.state = Materialized::Poisoned;
                    return Err(e);
                }
            };
        }

        match &mut self.state {
            Materialized::Ready { rows, cursor } => {
                let row = rows.get(*cursor).cloned();
                if row.is_some() {
                    *cursor += 1;
                }
                Ok(row)
            }
            Materialized::Poisoned => Err(PlanError::Poisoned),
            Materialized::Pending => Err(PlanError::Exec(
                "distinct rows were not materialized".into(),
            )),
        }
    }

    fn close(&mut self) -> Result<(), PlanError> {
        self.src.close()
    }

    fn filter(
        self: Box<Self>,
        _ctx: &ExecContext,
        _predicate: &Predicate,
    ) -> Result<(Box<dyn Plan>, bool), PlanError> {
        // Group membership must be decided on unfiltered rows.
        let plan: Box<dyn Plan> = self;
        Ok((plan, false))
    }

    fn use_next(&self) -> bool {
        self.src.use_next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::ValuesPlan;
    use qdistinct_core::schema::DataType;
    use qdistinct_core::types::Scalar;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("_handle", DataType::Int64, false),
        ]
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new(vec![1i64.into(), "a".into(), 101i64.into()]),
            Row::new(vec![2i64.into(), "b".into(), 102i64.into()]),
            Row::new(vec![1i64.into(), "c".into(), 103i64.into()]),
        ]
    }

    fn distinct(offset: usize) -> DistinctPlan {
        let src = Box::new(ValuesPlan::new(fields(), rows()));
        DistinctPlan::new(src, offset).unwrap()
    }

    fn handles(rows: &[Row]) -> Vec<Scalar> {
        rows.iter().map(|r| r.data[2].clone()).collect()
    }

    #[test]
    fn two_visible_columns_keep_all_three_rows() {
        let ctx = ExecContext::in_memory(1024 * 1024);
        let mut plan = distinct(2);
        let mut out = Vec::new();
        plan.run(&ctx, &mut |row| {
            out.push(row);
            Ok(true)
        })
        .unwrap();
        assert_eq!(out, rows());
        assert_eq!(plan.stats().duplicates, 0);
    }

    #[test]
    fn one_visible_column_drops_the_repeat() {
        let ctx = ExecContext::in_memory(1024 * 1024);
        let mut plan = distinct(1);
        let mut out = Vec::new();
        while let Some(row) = plan.next(&ctx).unwrap() {
            out.push(row);
        }
        assert_eq!(handles(&out), vec![Scalar::I64(101), Scalar::I64(102)]);
        assert_eq!(
            plan.stats(),
            DistinctStats {
                rows_in: 3,
                rows_out: 2,
                duplicates: 1
            }
        );
    }

    #[test]
    fn explain_appends_visible_names() {
        let plan = distinct(2);
        assert_eq!(plan.hidden_field_offset(), 2);
        let mut text = String::new();
        plan.explain(&mut text);
        assert!(text.ends_with("┌Compute distinct rows\n└Output field names [id, name]\n"));
        assert!(text.starts_with("┌Iterate 3 rows of values"));
    }

    #[test]
    fn filter_is_never_absorbed() {
        let ctx = ExecContext::in_memory(1024);
        let pred = Predicate::parse("id == 1").unwrap();
        let (plan, absorbed) = Box::new(distinct(1)).filter(&ctx, &pred).unwrap();
        assert!(!absorbed);
        assert_eq!(plan.name(), "distinct");
    }

    #[test]
    fn use_next_follows_upstream() {
        let src = Box::new(ValuesPlan::new(fields(), rows()).with_use_next(true));
        assert!(DistinctPlan::new(src, 1).unwrap().use_next());
        assert!(!distinct(1).use_next());
    }

    #[test]
    fn offset_wider_than_fields_is_rejected() {
        let src = Box::new(ValuesPlan::new(fields(), rows()));
        assert!(matches!(DistinctPlan::new(src, 4), Err(PlanError::Plan(_))));
    }

    #[test]
    fn store_failure_poisons_pull_mode() {
        // A zero-byte cap makes the first key insert fail.
        let ctx = ExecContext::in_memory(0);
        let mut plan = distinct(1);
        assert!(matches!(plan.next(&ctx), Err(PlanError::Store(_))));
        assert!(matches!(plan.next(&ctx), Err(PlanError::Poisoned)));
    }
}
