//! # calcdate-engine
//!
//! A small expression language for calendar arithmetic.
//!
//! Expressions such as `today +1d`, `now | +2h | round hour` or
//! `2024-01-15...+7d | endOfMonth` evaluate to a timestamp or a timestamp
//! range. Ranges can be split into fixed or calendar intervals, each one
//! optionally reshaped by a transform like `$begin +8h, $end +20h`.
//!
//! All evaluation is relative to an explicit reference instant held in an
//! [`EvalContext`]; the engine never reads the system clock.
//!
//! ## Modules
//!
//! - [`lexer`]: expression text to tokens
//! - [`parser`]: tokens to an [`Expr`] tree, plus transform parsing
//! - [`ast`]: the expression tree
//! - [`eval`]: single values, ranges and transforms
//! - [`calendar`]: date literals and the operation catalog
//! - [`range`]: interval parsing and range iteration
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```
//! use calcdate_engine::{evaluate_expression, EvalContext};
//! use chrono::{DateTime, Utc};
//!
//! let now: DateTime<Utc> = "2024-01-17T15:45:30Z".parse().unwrap();
//! let ctx = EvalContext::new(now, Utc);
//! let dt = evaluate_expression("2024-01-15 +1d | endOfMonth", &ctx).unwrap();
//! assert_eq!(dt.to_rfc3339(), "2024-01-31T23:59:59.999999999+00:00");
//! ```

pub mod ast;
pub mod calendar;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod range;

use chrono::{DateTime, TimeZone};
use tracing::debug;

pub use ast::{Expr, Operation, Transform};
pub use calendar::{
    apply_operation, apply_operation_with_options, days_in_month, is_leap_year,
    parse_date_value, parse_timezone, EvalOptions, WeekStartDay,
};
pub use error::{CalcError, EvalError, IterationError, LexError, ParseError, Result};
pub use eval::{evaluate, evaluate_range, evaluate_transform, EvalContext};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_transform};
pub use range::{
    iterate_range, parse_interval, Interval, IterationResult, RangeIterator, MAX_ITERATIONS,
};

/// Parse and evaluate a single-value expression.
///
/// # Errors
///
/// Returns [`CalcError::Parse`] or [`CalcError::Eval`].
pub fn evaluate_expression<Tz: TimeZone>(
    input: &str,
    ctx: &EvalContext<Tz>,
) -> Result<DateTime<Tz>> {
    let expr = parse(input)?;
    Ok(evaluate(&expr, ctx)?)
}

/// Parse and evaluate a range expression to its `(start, end)` pair.
///
/// # Errors
///
/// Returns [`CalcError::Parse`], or [`CalcError::Eval`] (including
/// [`EvalError::NotARange`] for a single-value expression).
pub fn evaluate_range_expression<Tz: TimeZone>(
    input: &str,
    ctx: &EvalContext<Tz>,
) -> Result<(DateTime<Tz>, DateTime<Tz>)> {
    let expr = parse(input)?;
    Ok(evaluate_range(&expr, ctx)?)
}

/// Parse an expression, interval and optional transform, and iterate.
///
/// A range expression is split by `interval` (empty for a single
/// iteration over the whole range). A single-value expression is treated
/// as the empty range `[value, value]` and yields one result; combining it
/// with an interval is [`IterationError::IntervalWithoutRange`].
///
/// # Errors
///
/// Returns any [`CalcError`] raised while parsing, evaluating or
/// iterating.
pub fn iterate_expression<Tz: TimeZone>(
    input: &str,
    interval: &str,
    transform: Option<&str>,
    ctx: &EvalContext<Tz>,
) -> Result<Vec<IterationResult<Tz>>> {
    let expr = parse(input)?;
    let interval = parse_interval(interval)?;
    let transform = transform
        .filter(|t| !t.trim().is_empty())
        .map(parse_transform)
        .transpose()?;

    let (start, end) = if expr.is_range() {
        evaluate_range(&expr, ctx)?
    } else if interval.is_some() {
        return Err(IterationError::IntervalWithoutRange.into());
    } else {
        let value = evaluate(&expr, ctx)?;
        (value.clone(), value)
    };

    debug!(input, ?interval, has_transform = transform.is_some(), "iterating expression");
    Ok(iterate_range(start, end, interval, transform.as_ref(), ctx)?)
}
