//! Expression evaluation against a point-in-time context.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::ast::{Expr, Transform};
use crate::calendar::{apply_operation_with_options, parse_date_value, EvalOptions};
use crate::error::EvalError;

/// Everything an expression may refer to while being evaluated.
///
/// `now` is captured once by the caller and reused by every node, so one
/// expression never observes two different instants.
#[derive(Debug, Clone)]
pub struct EvalContext<Tz: TimeZone> {
    pub now: DateTime<Tz>,
    pub tz: Tz,
    pub variables: HashMap<String, DateTime<Tz>>,
    /// Zero-based iteration index while evaluating a transform.
    pub index: usize,
    pub options: EvalOptions,
}

impl<Tz: TimeZone> EvalContext<Tz> {
    /// A context anchored at `reference_now`, evaluating in `tz`.
    pub fn new(reference_now: DateTime<Utc>, tz: Tz) -> Self {
        EvalContext {
            now: reference_now.with_timezone(&tz),
            tz,
            variables: HashMap::new(),
            index: 0,
            options: EvalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Bind `name` (including its `$`) to `value`.
    pub fn with_variable(mut self, name: impl Into<String>, value: DateTime<Tz>) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&DateTime<Tz>> {
        self.variables.get(name)
    }
}

/// Evaluate an expression to a single instant.
///
/// # Errors
///
/// Returns [`EvalError::RangeNotSingleValue`] for a range,
/// [`EvalError::TransformNotSingleValue`] for a transform,
/// [`EvalError::OperationWithoutBase`] for a bare operation, and the
/// errors of [`parse_date_value`] and the calendar operations otherwise.
pub fn evaluate<Tz: TimeZone>(expr: &Expr, ctx: &EvalContext<Tz>) -> Result<DateTime<Tz>, EvalError> {
    match expr {
        Expr::Date(value) => parse_date_value(value, ctx),
        Expr::Variable(name) => ctx
            .variable(name)
            .cloned()
            .ok_or_else(|| EvalError::MissingVariable(name.clone())),
        Expr::Pipe { base, operations } => {
            let mut current = evaluate(base, ctx)?;
            for op in operations {
                current =
                    apply_operation_with_options(&current, &op.op, &op.value, &ctx.tz, ctx.options)?;
            }
            Ok(current)
        }
        Expr::Operation(op) => Err(EvalError::OperationWithoutBase(op.op.clone())),
        Expr::Range { .. } => Err(EvalError::RangeNotSingleValue),
        Expr::Transform(_) => Err(EvalError::TransformNotSingleValue),
    }
}

/// Evaluate both sides of a range. The sides are independent and returned
/// as written; a start after the end is not swapped.
///
/// A pipeline whose base is a range (`a...b | endOfMonth`) applies its
/// operations to the end of the range only.
///
/// # Errors
///
/// Returns [`EvalError::NotARange`] when `expr` is not a range.
pub fn evaluate_range<Tz: TimeZone>(
    expr: &Expr,
    ctx: &EvalContext<Tz>,
) -> Result<(DateTime<Tz>, DateTime<Tz>), EvalError> {
    match expr {
        Expr::Range { start, end } => {
            let start = evaluate(start, ctx)?;
            let end = evaluate(end, ctx)?;
            debug!(start = ?start, end = ?end, "evaluated range");
            Ok((start, end))
        }
        Expr::Pipe { base, operations } if base.is_range() => {
            let (start, mut end) = evaluate_range(base, ctx)?;
            for op in operations {
                end = apply_operation_with_options(&end, &op.op, &op.value, &ctx.tz, ctx.options)?;
            }
            Ok((start, end))
        }
        _ => Err(EvalError::NotARange),
    }
}

/// Reshape one iteration's interval with a transform.
///
/// Both transform expressions see `$begin` and `$end` bound to the given
/// values and `index` as the iteration index. The parent context's `now`,
/// timezone, options and other variables carry over unchanged.
pub fn evaluate_transform<Tz: TimeZone>(
    transform: &Transform,
    begin: &DateTime<Tz>,
    end: &DateTime<Tz>,
    index: usize,
    ctx: &EvalContext<Tz>,
) -> Result<(DateTime<Tz>, DateTime<Tz>), EvalError> {
    let mut scoped = ctx
        .clone()
        .with_variable("$begin", begin.clone())
        .with_variable("$end", end.clone());
    scoped.index = index;

    let new_begin = evaluate(&transform.begin, &scoped)?;
    let new_end = evaluate(&transform.end, &scoped)?;
    Ok((new_begin, new_end))
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operation;
    use crate::calendar::WeekStartDay;
    use crate::parser::{parse, parse_transform};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn ctx() -> EvalContext<Utc> {
        EvalContext::new(utc("2024-01-17T15:45:30Z"), Utc)
    }

    fn eval(input: &str) -> Result<DateTime<Utc>, EvalError> {
        evaluate(&parse(input).unwrap(), &ctx())
    }

    #[test]
    fn test_evaluate_date_literal() {
        assert_eq!(eval("2024-01-15").unwrap(), utc("2024-01-15T00:00:00Z"));
    }

    #[test]
    fn test_evaluate_pipeline_folds_left_to_right() {
        assert_eq!(
            eval("2024-01-15 +1d | endOfMonth").unwrap(),
            utc("2024-01-31T23:59:59.999999999Z")
        );
        assert_eq!(
            eval("2024-01-15 endOfMonth +1d").unwrap(),
            utc("2024-02-01T23:59:59.999999999Z")
        );
    }

    #[test]
    fn test_evaluate_pipeline_stops_at_first_error() {
        assert_eq!(
            eval("today | +1d | round week").unwrap_err(),
            EvalError::UnknownUnit("week".into())
        );
    }

    #[test]
    fn test_evaluate_range_reads_now_once() {
        let expr = parse("now...now +1h").unwrap();
        let (start, end) = evaluate_range(&expr, &ctx()).unwrap();
        assert_eq!(start, utc("2024-01-17T15:45:30Z"));
        assert_eq!(end - start, chrono::Duration::hours(1));
    }

    #[test]
    fn test_evaluate_missing_variable() {
        assert_eq!(
            eval("$begin +1h").unwrap_err(),
            EvalError::MissingVariable("$begin".into())
        );
    }

    #[test]
    fn test_evaluate_bound_variable() {
        let ctx = ctx().with_variable("$start", utc("2024-03-01T00:00:00Z"));
        let expr = parse("$start | endOfMonth").unwrap();
        assert_eq!(
            evaluate(&expr, &ctx).unwrap(),
            utc("2024-03-31T23:59:59.999999999Z")
        );
    }

    #[test]
    fn test_evaluate_rejects_non_single_values() {
        assert_eq!(
            eval("today...tomorrow").unwrap_err(),
            EvalError::RangeNotSingleValue
        );
        assert_eq!(
            eval("endOfMonth").unwrap_err(),
            EvalError::OperationWithoutBase("endofmonth".into())
        );
        let transform = Expr::Transform(Box::new(parse_transform("$begin, $end").unwrap()));
        assert_eq!(
            evaluate(&transform, &ctx()).unwrap_err(),
            EvalError::TransformNotSingleValue
        );
    }

    #[test]
    fn test_evaluate_uses_week_start_option() {
        let ctx = ctx().with_options(EvalOptions {
            week_start: WeekStartDay::Sunday,
        });
        let expr = parse("today | startOfWeek").unwrap();
        assert_eq!(
            evaluate(&expr, &ctx).unwrap(),
            utc("2024-01-14T00:00:00Z")
        );
    }

    #[test]
    fn test_evaluate_range() {
        let expr = parse("2024-01-15...+7d").unwrap();
        let (start, end) = evaluate_range(&expr, &ctx()).unwrap();
        assert_eq!(start, utc("2024-01-15T00:00:00Z"));
        assert_eq!(end, utc("2024-01-24T15:45:30Z"));
    }

    #[test]
    fn test_evaluate_range_pipeline_applies_to_end() {
        let expr = parse("2024-01-15...2024-02-10 | endOfMonth").unwrap();
        let (start, end) = evaluate_range(&expr, &ctx()).unwrap();
        assert_eq!(start, utc("2024-01-15T00:00:00Z"));
        assert_eq!(end, utc("2024-02-29T23:59:59.999999999Z"));
    }

    #[test]
    fn test_evaluate_range_does_not_swap() {
        let expr = parse("tomorrow...yesterday").unwrap();
        let (start, end) = evaluate_range(&expr, &ctx()).unwrap();
        assert!(start > end);
    }

    #[test]
    fn test_evaluate_range_rejects_single_value() {
        let expr = parse("today +1d").unwrap();
        assert_eq!(
            evaluate_range(&expr, &ctx()).unwrap_err(),
            EvalError::NotARange
        );
    }

    #[test]
    fn test_evaluate_transform() {
        let transform = parse_transform("$begin +8h, $end +20h").unwrap();
        let (begin, end) = evaluate_transform(
            &transform,
            &utc("2024-01-01T00:00:00Z"),
            &utc("2024-01-02T00:00:00Z"),
            0,
            &ctx(),
        )
        .unwrap();
        assert_eq!(begin, utc("2024-01-01T08:00:00Z"));
        assert_eq!(end, utc("2024-01-02T20:00:00Z"));
    }

    #[test]
    fn test_evaluate_transform_keeps_parent_now() {
        let transform = Transform {
            begin: Expr::Date("now".into()),
            end: Expr::Pipe {
                base: Box::new(Expr::Variable("$end".into())),
                operations: vec![Operation::new("-", "1s")],
            },
        };
        let (begin, end) = evaluate_transform(
            &transform,
            &utc("2024-01-01T00:00:00Z"),
            &utc("2024-01-02T00:00:00Z"),
            3,
            &ctx(),
        )
        .unwrap();
        assert_eq!(begin, utc("2024-01-17T15:45:30Z"));
        assert_eq!(end, utc("2024-01-01T23:59:59Z"));
    }
}
