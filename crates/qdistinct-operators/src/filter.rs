//! Filter operator with simple predicate evaluation.
//!
//! Supports expressions of the form: "col OP literal" where OP ∈ {==, !=, <, <=, >, >=}

use std::fmt;

use qdistinct_core::schema::Field;
use qdistinct_core::types::{Row, Scalar};

use crate::context::ExecContext;
use crate::explain::{field_names, Formatter};
use crate::traits::{Plan, PlanError, RowIterFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    fn apply<T: PartialOrd>(self, a: &T, b: &T) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }
}

/// Unbound predicate: column name, operator, literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: CmpOp,
    pub literal: String,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op.symbol(), self.literal)
    }
}

impl Predicate {
    /// Parse a simple predicate like "age > 18" or "name == Alice".
    pub fn parse(expr: &str) -> Result<Self, PlanError> {
        // Two-char operators first so "<=" is not read as "<".
        let ops = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ];

        for (sym, op) in ops {
            if let Some(pos) = expr.find(sym) {
                let column = expr[..pos].trim().to_string();
                let literal = expr[pos + sym.len()..].trim().to_string();
                if column.is_empty() {
                    break;
                }
                return Ok(Self {
                    column,
                    op,
                    literal,
                });
            }
        }

        Err(PlanError::Plan(format!("unparseable predicate: {}", expr)))
    }

    /// Resolve the column against `fields`.
    pub fn bind(&self, fields: &[Field]) -> Result<BoundPredicate, PlanError> {
        let col_idx = fields
            .iter()
            .position(|f| f.name == self.column)
            .ok_or_else(|| PlanError::Plan(format!("column '{}' not found", self.column)))?;
        Ok(BoundPredicate {
            col_idx,
            op: self.op,
            literal: self.literal.clone(),
        })
    }
}

/// Predicate resolved to a column index.
#[derive(Debug, Clone)]
pub struct BoundPredicate {
    col_idx: usize,
    op: CmpOp,
    literal: String,
}

impl BoundPredicate {
    pub fn eval(&self, row: &Row) -> Result<bool, PlanError> {
        let val = row.get(self.col_idx).ok_or_else(|| {
            PlanError::Exec(format!(
                "filter column {} out of range for row of width {}",
                self.col_idx,
                row.len()
            ))
        })?;
        eval_predicate(val, self.op, &self.literal)
    }
}

fn parse_literal<T: std::str::FromStr>(literal: &str, ty: &str) -> Result<T, PlanError> {
    literal
        .parse::<T>()
        .map_err(|_| PlanError::Exec(format!("cannot parse '{}' as {}", literal, ty)))
}

/// Compare an integer cell; falls back to float comparison for literals
/// like "1.5" so mixed int/float columns still filter.
fn eval_int(v: i64, op: CmpOp, literal: &str) -> Result<bool, PlanError> {
    match literal.parse::<i64>() {
        Ok(lit) => Ok(op.apply(&v, &lit)),
        Err(_) => Ok(op.apply(&(v as f64), &parse_literal::<f64>(literal, "number")?)),
    }
}

/// Evaluate a simple comparison predicate
fn eval_predicate(val: &Scalar, op: CmpOp, literal: &str) -> Result<bool, PlanError> {
    use Scalar::*;

    match val {
        Null => Ok(false), // Null comparisons are false
        Bool(b) => {
            let lit: bool = parse_literal(literal, "bool")?;
            match op {
                CmpOp::Eq | CmpOp::Ne => Ok(op.apply(b, &lit)),
                _ => Err(PlanError::Exec(format!(
                    "unsupported op '{}' for bool",
                    op.symbol()
                ))),
            }
        }
        I32(i) => eval_int(*i as i64, op, literal),
        I64(i) => eval_int(*i, op, literal),
        F32(f) => Ok(op.apply(&(*f as f64), &parse_literal::<f64>(literal, "f32")?)),
        F64(f) => Ok(op.apply(f, &parse_literal::<f64>(literal, "f64")?)),
        Str(s) => Ok(op.apply(&s.as_str(), &literal)),
        Bin(_) => Err(PlanError::Exec("cannot filter on binary data".into())),
    }
}

/// Applies a predicate above its input, in both protocols.
pub struct FilterPlan {
    src: Box<dyn Plan>,
    predicate: Predicate,
    bound: BoundPredicate,
}

impl FilterPlan {
    pub fn new(src: Box<dyn Plan>, predicate: Predicate) -> Result<Self, PlanError> {
        let bound = predicate.bind(src.result_fields())?;
        Ok(Self {
            src,
            predicate,
            bound,
        })
    }
}

impl Plan for FilterPlan {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn explain(&self, w: &mut dyn Formatter) {
        self.src.explain(w);
        w.format(&format!(
            "┌Filter on {}\n└Output field names {}\n",
            self.predicate,
            field_names(self.src.result_fields())
        ));
    }

    fn result_fields(&self) -> &[Field] {
        self.src.result_fields()
    }

    fn run(&mut self, ctx: &ExecContext, f: &mut RowIterFn<'_>) -> Result<(), PlanError> {
        let bound = &self.bound;
        self.src.run(ctx, &mut |row: Row| {
            if bound.eval(&row)? {
                f(row)
            } else {
                Ok(true)
            }
        })
    }

    fn next(&mut self, ctx: &ExecContext) -> Result<Option<Row>, PlanError> {
        while let Some(row) = self.src.next(ctx)? {
            if self.bound.eval(&row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), PlanError> {
        self.src.close()
    }

    fn filter(
        self: Box<Self>,
        ctx: &ExecContext,
        predicate: &Predicate,
    ) -> Result<(Box<dyn Plan>, bool), PlanError> {
        // Conjunctions commute, so a second filter may sink below this one.
        let mut this = *self;
        let (src, absorbed) = this.src.filter(ctx, predicate)?;
        this.src = src;
        let plan: Box<dyn Plan> = Box::new(this);
        Ok((plan, absorbed))
    }

    fn use_next(&self) -> bool {
        self.src.use_next()
    }
}

/// Offer `predicate` to `plan`; wrap it in a `FilterPlan` if not absorbed.
pub fn push_filter(
    plan: Box<dyn Plan>,
    ctx: &ExecContext,
    predicate: &Predicate,
) -> Result<Box<dyn Plan>, PlanError> {
    let (plan, absorbed) = plan.filter(ctx, predicate)?;
    if absorbed {
        Ok(plan)
    } else {
        Ok(Box::new(FilterPlan::new(plan, predicate.clone())?))
    }
}
