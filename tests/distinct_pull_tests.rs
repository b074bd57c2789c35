//! DISTINCT driven through the pull protocol (`Plan::next`), and its
//! agreement with the push protocol.

mod test_data_gen;

use qdistinct_core::schema::{DataType, Field};
use qdistinct_core::types::{Row, Scalar};
use qdistinct_operators::{DistinctPlan, ExecContext, Plan, PlanError, ValuesPlan};
use std::sync::atomic::Ordering;
use test_data_gen::{
    first_occurrences, flaky_context, generate_keys, keyed_fields, keyed_rows, Failure,
    ScriptedPlan, StoreFaults,
};

fn drain(plan: &mut dyn Plan, ctx: &ExecContext) -> Result<Vec<Row>, PlanError> {
    let mut out = Vec::new();
    while let Some(row) = plan.next(ctx)? {
        out.push(row);
    }
    Ok(out)
}

fn push_all(plan: &mut dyn Plan, ctx: &ExecContext) -> Result<Vec<Row>, PlanError> {
    let mut out = Vec::new();
    plan.run(ctx, &mut |row| {
        out.push(row);
        Ok(true)
    })?;
    Ok(out)
}

/// `(id, name, _handle)` rows from the operator's documented example.
fn example_rows() -> (Vec<Field>, Vec<Row>) {
    let fields = vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("_handle", DataType::Int64, false),
    ];
    let rows = vec![
        Row::new(vec![1i64.into(), "a".into(), 1001i64.into()]),
        Row::new(vec![2i64.into(), "b".into(), 1002i64.into()]),
        Row::new(vec![1i64.into(), "c".into(), 1003i64.into()]),
    ];
    (fields, rows)
}

#[test]
fn test_documented_example_in_both_modes() {
    let ctx = ExecContext::in_memory(1024 * 1024);
    for offset in [2usize, 1] {
        let (fields, rows) = example_rows();
        let mut pull =
            DistinctPlan::new(Box::new(ValuesPlan::new(fields.clone(), rows.clone())), offset)
                .unwrap();
        let mut push =
            DistinctPlan::new(Box::new(ValuesPlan::new(fields, rows.clone())), offset).unwrap();

        let pulled = drain(&mut pull, &ctx).unwrap();
        let pushed = push_all(&mut push, &ctx).unwrap();
        assert_eq!(pulled, pushed);

        let expected = if offset == 2 { rows } else { rows[..2].to_vec() };
        assert_eq!(pulled, expected, "offset {offset}");
    }
}

#[test]
fn test_push_and_pull_agree_on_generated_input() {
    let ctx = ExecContext::in_memory(16 * 1024 * 1024);
    for seed in 1..=5 {
        let rows = keyed_rows(&generate_keys(500, 40, seed));
        let mut pull =
            DistinctPlan::new(Box::new(ValuesPlan::new(keyed_fields(), rows.clone())), 1).unwrap();
        let mut push =
            DistinctPlan::new(Box::new(ValuesPlan::new(keyed_fields(), rows.clone())), 1).unwrap();

        let pulled = drain(&mut pull, &ctx).unwrap();
        assert_eq!(pulled, push_all(&mut push, &ctx).unwrap());
        assert_eq!(pulled, first_occurrences(&rows, 1));
        assert_eq!(pull.stats(), push.stats());
    }
}

#[test]
fn test_exhausted_plan_keeps_returning_none() {
    let (ctx, factory) = flaky_context(StoreFaults::default());
    let mut plan = DistinctPlan::new(Box::new(ScriptedPlan::keyed(&[2, 2])), 1).unwrap();

    assert!(plan.next(&ctx).unwrap().is_some());
    for _ in 0..3 {
        assert!(plan.next(&ctx).unwrap().is_none());
    }
    assert_eq!(factory.created(), 1, "materialized once");
    assert_eq!(factory.dropped(), 1);
}

#[test]
fn test_empty_input_yields_none() {
    let ctx = ExecContext::in_memory(1024);
    let mut plan = DistinctPlan::new(Box::new(ScriptedPlan::keyed(&[])), 1).unwrap();
    assert!(plan.next(&ctx).unwrap().is_none());
    assert!(plan.next(&ctx).unwrap().is_none());
}

#[test]
fn test_materialization_happens_on_first_call() {
    let ctx = ExecContext::in_memory(1024 * 1024);
    let src = ScriptedPlan::keyed(&[1, 2, 1, 3]);
    let handed_out = src.rows_handed_out.clone();
    let mut plan = DistinctPlan::new(Box::new(src), 1).unwrap();

    assert_eq!(handed_out.load(Ordering::SeqCst), 0);
    let first = plan.next(&ctx).unwrap().unwrap();
    assert_eq!(first.data[1], Scalar::I64(0));
    assert_eq!(handed_out.load(Ordering::SeqCst), 4);
}

#[test]
fn test_upstream_error_fails_first_call_and_poisons() {
    let (ctx, factory) = flaky_context(StoreFaults::default());
    let src = ScriptedPlan::keyed(&[1, 2, 3]).fail_at(2, Failure::Upstream);
    let mut plan = DistinctPlan::new(Box::new(src), 1).unwrap();

    assert!(matches!(plan.next(&ctx), Err(PlanError::Upstream(_))));
    assert!(matches!(plan.next(&ctx), Err(PlanError::Poisoned)));
    assert_eq!(factory.dropped(), 1);
}

#[test]
fn test_end_of_stream_is_normal_termination() {
    let ctx = ExecContext::in_memory(1024 * 1024);
    let src = ScriptedPlan::keyed(&[7, 8, 7, 9]).fail_at(3, Failure::EndOfStream);
    let mut plan = DistinctPlan::new(Box::new(src), 1).unwrap();

    let out = drain(&mut plan, &ctx).unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn test_drop_failure_surfaces_when_materialization_succeeded() {
    let (ctx, factory) = flaky_context(StoreFaults {
        fail_drop: true,
        ..StoreFaults::default()
    });
    let mut plan = DistinctPlan::new(Box::new(ScriptedPlan::keyed(&[1, 2])), 1).unwrap();

    assert!(matches!(plan.next(&ctx), Err(PlanError::Store(_))));
    assert_eq!(factory.dropped(), 1);
}

#[test]
fn test_upstream_error_wins_over_drop_failure() {
    let (ctx, _factory) = flaky_context(StoreFaults {
        fail_drop: true,
        ..StoreFaults::default()
    });
    let src = ScriptedPlan::keyed(&[1, 2]).fail_at(0, Failure::Upstream);
    let mut plan = DistinctPlan::new(Box::new(src), 1).unwrap();

    assert!(matches!(plan.next(&ctx), Err(PlanError::Upstream(_))));
}

#[test]
fn test_store_set_failure_propagates() {
    let (ctx, factory) = flaky_context(StoreFaults {
        fail_set: true,
        ..StoreFaults::default()
    });
    let mut plan = DistinctPlan::new(Box::new(ScriptedPlan::keyed(&[1])), 1).unwrap();

    assert!(matches!(plan.next(&ctx), Err(PlanError::Store(_))));
    assert_eq!(factory.dropped(), 1);
}

#[test]
fn test_cancelled_context_fails_materialization() {
    let (ctx, factory) = flaky_context(StoreFaults::default());
    ctx.cancel_handle().cancel();
    let mut plan = DistinctPlan::new(Box::new(ScriptedPlan::keyed(&[1, 2])), 1).unwrap();

    assert!(matches!(plan.next(&ctx), Err(PlanError::Cancelled)));
    assert_eq!(factory.dropped(), 1);
}

#[test]
fn test_hidden_columns_do_not_split_groups() {
    // Same visible key, different hidden payloads.
    let ctx = ExecContext::in_memory(1024 * 1024);
    let fields = vec![
        Field::new("k", DataType::Utf8, false),
        Field::new("_a", DataType::Int64, false),
        Field::new("_b", DataType::Utf8, true),
    ];
    let rows = vec![
        Row::new(vec!["x".into(), 1i64.into(), "p".into()]),
        Row::new(vec!["x".into(), 2i64.into(), Scalar::Null]),
        Row::new(vec![Scalar::Null, 3i64.into(), "q".into()]),
        Row::new(vec![Scalar::Null, 4i64.into(), "r".into()]),
    ];
    let mut plan = DistinctPlan::new(Box::new(ValuesPlan::new(fields, rows.clone())), 1).unwrap();

    let out = drain(&mut plan, &ctx).unwrap();
    assert_eq!(out, vec![rows[0].clone(), rows[2].clone()]);
}

#[test]
fn test_zero_offset_keeps_only_the_first_row() {
    let ctx = ExecContext::in_memory(1024 * 1024);
    let rows = keyed_rows(&[5, 6, 7]);
    let mut plan =
        DistinctPlan::new(Box::new(ValuesPlan::new(keyed_fields(), rows.clone())), 0).unwrap();
    assert_eq!(drain(&mut plan, &ctx).unwrap(), vec![rows[0].clone()]);
}
