//! In-memory row source.
//!
//! Leaf of most plan trees built by the CLI and the tests. It absorbs pushed
//! filters by dropping non-matching rows up front.

use qdistinct_core::schema::{Field, Schema};
use qdistinct_core::types::Row;

use crate::context::ExecContext;
use crate::explain::{field_names, Formatter};
use crate::filter::Predicate;
use crate::traits::{Plan, PlanError, RowIterFn};

pub struct ValuesPlan {
    fields: Vec<Field>,
    rows: Vec<Row>,
    cursor: usize,
    prefer_next: bool,
}

impl ValuesPlan {
    pub fn new(fields: Vec<Field>, rows: Vec<Row>) -> Self {
        Self {
            fields,
            rows,
            cursor: 0,
            prefer_next: false,
        }
    }

    pub fn from_schema(schema: Schema, rows: Vec<Row>) -> Self {
        Self::new(schema.fields, rows)
    }

    /// Make `use_next` report a preference for the pull protocol.
    pub fn with_use_next(mut self, prefer_next: bool) -> Self {
        self.prefer_next = prefer_next;
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl Plan for ValuesPlan {
    fn name(&self) -> &'static str {
        "values"
    }

    fn explain(&self, w: &mut dyn Formatter) {
        w.format(&format!(
            "┌Iterate {} rows of values\n└Output field names {}\n",
            self.rows.len(),
            field_names(&self.fields)
        ));
    }

    fn result_fields(&self) -> &[Field] {
        &self.fields
    }

    fn run(&mut self, ctx: &ExecContext, f: &mut RowIterFn<'_>) -> Result<(), PlanError> {
        for row in &self.rows {
            ctx.check_cancelled()?;
            if !f(row.clone())? {
                break;
            }
        }
        Ok(())
    }

    fn next(&mut self, ctx: &ExecContext) -> Result<Option<Row>, PlanError> {
        ctx.check_cancelled()?;
        let row = self.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<(), PlanError> {
        self.cursor = 0;
        Ok(())
    }

    fn filter(
        mut self: Box<Self>,
        _ctx: &ExecContext,
        predicate: &Predicate,
    ) -> Result<(Box<dyn Plan>, bool), PlanError> {
        let bound = predicate.bind(&self.fields)?;
        let mut kept = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..) {
            if bound.eval(&row)? {
                kept.push(row);
            }
        }
        self.rows = kept;
        self.cursor = 0;
        let plan: Box<dyn Plan> = self;
        Ok((plan, true))
    }

    fn use_next(&self) -> bool {
        self.prefer_next
    }
}
