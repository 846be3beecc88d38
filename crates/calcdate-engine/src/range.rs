//! Range iteration: split a `(start, end)` pair into consecutive intervals,
//! optionally reshaping each one with a [`Transform`].
//!
//! Fixed intervals (`s m h d w`) step by an absolute duration. Calendar
//! intervals (`M q Y`) step by calendar months from the current begin, in
//! the context's timezone. Each step is clamped to the range end, and the
//! next step always starts at the untransformed end of the previous one.

use std::cmp::min;

use chrono::{DateTime, Duration, TimeZone};
use serde::Serialize;
use tracing::{debug, trace};

use crate::ast::Transform;
use crate::calendar::shift;
use crate::error::{EvalError, IterationError};
use crate::eval::{evaluate_transform, EvalContext};

/// Hard cap on the number of emitted iterations.
pub const MAX_ITERATIONS: usize = 10_000;

/// Step size of a range iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    /// Absolute duration, at least one second.
    Fixed(Duration),
    /// Calendar months (`1Y` is 12, `1q` is 3).
    Calendar { months: u32 },
}

/// One reported interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound = "")]
pub struct IterationResult<Tz: TimeZone> {
    pub begin: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub index: usize,
}

/// Parse an interval such as `1d`, `+1h30m`, `1M` or `2q`.
///
/// Fixed components (`s m h d w`) may be combined (`1d12h`), as may calendar
/// components (`1Y6M`); mixing the two is rejected. An empty string means
/// "no interval" and yields `None`.
///
/// # Errors
///
/// Returns [`IterationError::InvalidInterval`] for malformed, zero,
/// negative or mixed intervals.
pub fn parse_interval(text: &str) -> Result<Option<Interval>, IterationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let invalid = || IterationError::InvalidInterval(text.to_string());
    let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut seconds: i64 = 0;
    let mut months: i64 = 0;
    let mut num_buf = String::new();

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }
        if num_buf.is_empty() {
            return Err(invalid());
        }
        let n: i64 = num_buf.parse().map_err(|_| invalid())?;
        num_buf.clear();

        let (total, scale) = match ch {
            's' => (&mut seconds, 1),
            'm' => (&mut seconds, 60),
            'h' => (&mut seconds, 3600),
            'd' => (&mut seconds, 86_400),
            'w' => (&mut seconds, 604_800),
            'M' => (&mut months, 1),
            'q' => (&mut months, 3),
            'Y' => (&mut months, 12),
            _ => return Err(invalid()),
        };
        let amount = n.checked_mul(scale).ok_or_else(invalid)?;
        *total = total.checked_add(amount).ok_or_else(invalid)?;
    }

    // Trailing number without unit
    if !num_buf.is_empty() {
        return Err(invalid());
    }

    let interval = match (seconds, months) {
        (s, 0) if s > 0 => Interval::Fixed(Duration::try_seconds(s).ok_or_else(invalid)?),
        (0, m) if m > 0 => Interval::Calendar {
            months: u32::try_from(m).map_err(|_| invalid())?,
        },
        _ => return Err(invalid()),
    };
    Ok(Some(interval))
}

/// Lazily yields the intervals of a range.
///
/// Yields `Err` at most once, after which it is exhausted. Use
/// [`iterate_range`] to collect all results or fail as a whole.
pub struct RangeIterator<'a, Tz: TimeZone> {
    current: DateTime<Tz>,
    range_end: DateTime<Tz>,
    interval: Option<Interval>,
    transform: Option<&'a Transform>,
    ctx: &'a EvalContext<Tz>,
    index: usize,
    done: bool,
}

impl<'a, Tz: TimeZone> RangeIterator<'a, Tz> {
    /// # Errors
    ///
    /// Returns [`IterationError::InvertedRange`] when an interval is given
    /// and `start` is after `end`.
    pub fn new(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        interval: Option<Interval>,
        transform: Option<&'a Transform>,
        ctx: &'a EvalContext<Tz>,
    ) -> Result<Self, IterationError> {
        if interval.is_some() && start > end {
            return Err(IterationError::InvertedRange);
        }
        Ok(RangeIterator {
            current: start,
            range_end: end,
            interval,
            transform,
            ctx,
            index: 0,
            done: false,
        })
    }

    fn step_end(&self, interval: Interval) -> Result<DateTime<Tz>, IterationError> {
        let stepped = match interval {
            Interval::Fixed(duration) => self
                .current
                .clone()
                .checked_add_signed(duration)
                .ok_or_else(|| EvalError::OutOfRange(format!("{:?} + {duration}", self.current)))?,
            Interval::Calendar { months } => {
                shift(&self.current, i64::from(months), 'M', &self.ctx.tz)?
            }
        };
        Ok(min(stepped, self.range_end.clone()))
    }

    fn emit(
        &mut self,
        begin: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<IterationResult<Tz>, IterationError> {
        let index = self.index;
        self.index += 1;
        let (begin, end) = match self.transform {
            Some(transform) => evaluate_transform(transform, &begin, &end, index, self.ctx)?,
            None => (begin, end),
        };
        trace!(index, begin = ?begin, end = ?end, "range step");
        Ok(IterationResult { begin, end, index })
    }

    fn advance(&mut self) -> Option<Result<IterationResult<Tz>, IterationError>> {
        let Some(interval) = self.interval else {
            self.done = true;
            let (begin, end) = (self.current.clone(), self.range_end.clone());
            return Some(self.emit(begin, end));
        };

        if self.current >= self.range_end {
            self.done = true;
            return None;
        }

        let end = match self.step_end(interval) {
            Ok(end) => end,
            Err(err) => return Some(Err(err)),
        };
        if end.clone().signed_duration_since(self.current.clone()) < Duration::seconds(1) {
            self.done = true;
            return None;
        }
        if self.index >= MAX_ITERATIONS {
            return Some(Err(IterationError::TooManyIterations {
                limit: MAX_ITERATIONS,
            }));
        }

        let begin = std::mem::replace(&mut self.current, end.clone());
        Some(self.emit(begin, end))
    }
}

impl<Tz: TimeZone> Iterator for RangeIterator<'_, Tz> {
    type Item = Result<IterationResult<Tz>, IterationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.advance();
        if matches!(item, Some(Err(_))) {
            self.done = true;
        }
        item
    }
}

/// Iterate a range to completion.
///
/// With no interval, yields exactly one result covering the whole range
/// (transform still applied). Never returns partial results: any failure,
/// including exceeding [`MAX_ITERATIONS`], discards what was computed.
///
/// # Errors
///
/// Returns [`IterationError::InvertedRange`],
/// [`IterationError::TooManyIterations`], or [`IterationError::Eval`]
/// when a step or transform fails.
pub fn iterate_range<Tz: TimeZone>(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    interval: Option<Interval>,
    transform: Option<&Transform>,
    ctx: &EvalContext<Tz>,
) -> Result<Vec<IterationResult<Tz>>, IterationError> {
    let results = RangeIterator::new(start, end, interval, transform, ctx)?
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = results.len(), ?interval, "range iteration complete");
    Ok(results)
}

// ── Tests ───────────────────────────────────────────────────────────────────
