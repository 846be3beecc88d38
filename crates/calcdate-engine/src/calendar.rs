//! Calendar operations: date literals, relative shifts, boundary snapping,
//! rounding and field assignment.
//!
//! Every function is generic over [`chrono::TimeZone`] and takes its "now"
//! from an [`EvalContext`]; nothing here reads the system clock.
//!
//! Day, week, month, quarter and year arithmetic works on local wall-clock
//! time and is mapped back through [`localize`], so `+1d` across a DST
//! change keeps the time of day. Seconds, minutes and hours are absolute.

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, LocalResult, Months, NaiveDate,
    NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday,
};
use serde::Serialize;
use tracing::trace;

use crate::error::{CalcError, EvalError};
use crate::eval::EvalContext;
use crate::lexer::DATE_KEYWORDS;

// ── Configurable week start ─────────────────────────────────────────────────

/// Which day begins a week for `startOfWeek` / `endOfWeek`.
///
/// Does **not** affect weekday-name literals like `friday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WeekStartDay {
    /// ISO 8601 standard (Monday = day 0 of the week).
    #[default]
    Monday,
    /// US/Canada convention (Sunday = day 0 of the week).
    Sunday,
}

/// Options that change how calendar operations behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvalOptions {
    /// Which day starts the week for week boundaries.
    pub week_start: WeekStartDay,
}

/// How many days `weekday` is from the week-start day.
fn days_from_week_start(weekday: Weekday, week_start: WeekStartDay) -> u64 {
    match week_start {
        WeekStartDay::Monday => u64::from(weekday.num_days_from_monday()),
        WeekStartDay::Sunday => u64::from(weekday.num_days_from_sunday()),
    }
}

// ── Day-count helpers ───────────────────────────────────────────────────────

/// Gregorian leap year: divisible by 4, except centuries not divisible by 400.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`. Returns 0 for a month
/// outside that range.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Add a signed number of calendar months, clamping the day to the length
/// of the target month (`2022-03-31 + 1 month = 2022-04-30`).
pub fn add_months(naive: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        naive.checked_add_months(step)
    } else {
        naive.checked_sub_months(step)
    }
}

// ── Timezones ───────────────────────────────────────────────────────────────

/// Parse an IANA timezone name into [`chrono_tz::Tz`].
///
/// # Errors
///
/// Returns [`CalcError::InvalidTimezone`] for names missing from the
/// timezone database.
pub fn parse_timezone(name: &str) -> Result<chrono_tz::Tz, CalcError> {
    name.parse::<chrono_tz::Tz>()
        .map_err(|_| CalcError::InvalidTimezone(name.to_string()))
}

/// Fixed offset of a recognized timezone abbreviation (case-insensitive).
pub fn abbreviation_offset(name: &str) -> Option<FixedOffset> {
    const HOUR: i32 = 3600;
    let seconds = match name.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" => 0,
        "EST" => -5 * HOUR,
        "CST" => -6 * HOUR,
        "MST" => -7 * HOUR,
        "PST" => -8 * HOUR,
        "EDT" => -4 * HOUR,
        "CDT" => -5 * HOUR,
        "MDT" => -6 * HOUR,
        "PDT" => -7 * HOUR,
        "CET" | "BST" => HOUR,
        "CEST" => 2 * HOUR,
        "IST" => 5 * HOUR + 30 * 60,
        "JST" => 9 * HOUR,
        "AEST" => 10 * HOUR,
        "AEDT" => 11 * HOUR,
        _ => return None,
    };
    FixedOffset::east_opt(seconds)
}

/// Map a local wall-clock time onto `tz`.
///
/// An ambiguous time (DST fall-back) resolves to the earlier instant. A
/// time inside a DST gap is shifted forward by one hour.
pub fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, EvalError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => naive
            .checked_add_signed(Duration::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
            .ok_or_else(|| EvalError::OutOfRange(naive.to_string())),
    }
}

// ── Date literals ───────────────────────────────────────────────────────────

/// Resolve the text of a date literal against the context's reference
/// instant and timezone.
///
/// Accepts `now`, `today`, `yesterday`, `tomorrow`, weekday names (next
/// strictly-future occurrence, at midnight), relative quantities (`+1d`,
/// `-2h`, `3w`), ISO dates with optional time and offset, and bare
/// `HH:MM[:SS]` times (today at that time).
///
/// # Errors
///
/// Returns [`EvalError::InvalidDateValue`] for unrecognized text, and the
/// errors of relative shifts for quantities.
pub fn parse_date_value<Tz: TimeZone>(
    value: &str,
    ctx: &EvalContext<Tz>,
) -> Result<DateTime<Tz>, EvalError> {
    let tz = &ctx.tz;
    let now = ctx.now.with_timezone(tz);
    let today = now.date_naive();
    let lower = value.to_ascii_lowercase();

    let day_offset = match lower.as_str() {
        "now" => return Ok(now),
        "today" => Some(0),
        "yesterday" => Some(-1),
        "tomorrow" => Some(1),
        _ => None,
    };
    if let Some(days) = day_offset {
        let date = today
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| EvalError::OutOfRange(value.to_string()))?;
        return localize(tz, date.and_time(NaiveTime::MIN));
    }

    if DATE_KEYWORDS.contains(&lower.as_str()) {
        if let Ok(target) = lower.parse::<Weekday>() {
            return next_weekday(today, target, tz);
        }
    }

    if value.starts_with(['+', '-']) || is_unsigned_quantity(value) {
        return apply_relative(&now, value, tz);
    }

    if let Some((naive, offset)) = parse_iso_literal(value) {
        return match offset {
            Some(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(tz))
                .ok_or_else(|| EvalError::InvalidDateValue(value.to_string())),
            None => localize(tz, naive),
        };
    }

    if let Some(time) = parse_clock_time(value) {
        return localize(tz, today.and_time(time));
    }

    Err(EvalError::InvalidDateValue(value.to_string()))
}

fn next_weekday<Tz: TimeZone>(
    today: NaiveDate,
    target: Weekday,
    tz: &Tz,
) -> Result<DateTime<Tz>, EvalError> {
    let current = today.weekday().num_days_from_monday();
    let mut ahead = (target.num_days_from_monday() + 7 - current) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    let date = today
        .checked_add_days(Days::new(u64::from(ahead)))
        .ok_or_else(|| EvalError::OutOfRange(target.to_string()))?;
    localize(tz, date.and_time(NaiveTime::MIN))
}

/// `3d`, `12h`: digits followed by a single letter.
fn is_unsigned_quantity(value: &str) -> bool {
    let bytes = value.as_bytes();
    match bytes.split_last() {
        Some((last, digits)) => {
            !digits.is_empty()
                && digits.iter().all(u8::is_ascii_digit)
                && last.is_ascii_alphabetic()
        }
        None => false,
    }
}

/// `HH:MM:SS` or `HH:MM`.
fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// Split an ISO literal into its wall-clock value and explicit offset.
fn parse_iso_literal(value: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let date_part = value.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let rest = &value[10..];
    if rest.is_empty() {
        return Some((date.and_time(NaiveTime::MIN), None));
    }

    let rest = rest.strip_prefix(['T', ' '])?;
    let time_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ':'))
        .unwrap_or(rest.len());
    let time = parse_clock_time(&rest[..time_end])?;
    let zone = &rest[time_end..];

    let offset = match zone {
        "" => None,
        "Z" => Some(FixedOffset::east_opt(0)?),
        z if z.starts_with(' ') => Some(abbreviation_offset(&z[1..])?),
        z => Some(parse_numeric_offset(z)?),
    };
    Some((date.and_time(time), offset))
}

/// `±HH`, `±HHMM` or `±HH:MM`.
fn parse_numeric_offset(text: &str) -> Option<FixedOffset> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ── Relative shifts ─────────────────────────────────────────────────────────

/// Apply a relative quantity such as `+1d`, `-3M` or `2w` to `base`.
fn apply_relative<Tz: TimeZone>(
    base: &DateTime<Tz>,
    text: &str,
    tz: &Tz,
) -> Result<DateTime<Tz>, EvalError> {
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => (1, text),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return Err(EvalError::InvalidDateValue(text.to_string()));
    }

    let unit = &rest[digits_end..];
    let mut chars = unit.chars();
    let unit = match (chars.next(), chars.next()) {
        (Some(unit), None) => unit,
        (None, _) => return Err(EvalError::InvalidDateValue(text.to_string())),
        _ => return Err(EvalError::UnknownUnit(unit.to_string())),
    };

    let amount: i64 = rest[..digits_end]
        .parse()
        .map_err(|_| EvalError::OutOfRange(text.to_string()))?;
    shift(base, sign * amount, unit, tz)
}

/// Move `dt` by `amount` of `unit` (`s m h d w M q Y`).
///
/// # Errors
///
/// Returns [`EvalError::UnknownUnit`] for any other unit, and
/// [`EvalError::OutOfRange`] when the result is not representable.
pub fn shift<Tz: TimeZone>(
    dt: &DateTime<Tz>,
    amount: i64,
    unit: char,
    tz: &Tz,
) -> Result<DateTime<Tz>, EvalError> {
    let overflow = || EvalError::OutOfRange(format!("{amount}{unit}"));
    let local = dt.with_timezone(tz);

    match unit {
        's' | 'm' | 'h' => {
            let scale = match unit {
                's' => 1,
                'm' => 60,
                _ => 3600,
            };
            let delta = amount
                .checked_mul(scale)
                .and_then(Duration::try_seconds)
                .ok_or_else(overflow)?;
            local.checked_add_signed(delta).ok_or_else(overflow)
        }
        'd' | 'w' => {
            let days = if unit == 'w' {
                amount.checked_mul(7)
            } else {
                Some(amount)
            };
            let naive = days
                .and_then(Duration::try_days)
                .and_then(|delta| local.naive_local().checked_add_signed(delta))
                .ok_or_else(overflow)?;
            localize(tz, naive)
        }
        'M' | 'q' | 'Y' => {
            let scale = match unit {
                'M' => 1,
                'q' => 3,
                _ => 12,
            };
            let naive = amount
                .checked_mul(scale)
                .and_then(|months| add_months(local.naive_local(), months))
                .ok_or_else(overflow)?;
            localize(tz, naive)
        }
        other => Err(EvalError::UnknownUnit(other.to_string())),
    }
}

// ── Operations ──────────────────────────────────────────────────────────────

/// Apply one named calendar operation to `dt` in timezone `tz`, with the
/// default [`EvalOptions`].
///
/// # Errors
///
/// See [`apply_operation_with_options`].
pub fn apply_operation<Tz: TimeZone>(
    dt: &DateTime<Tz>,
    op: &str,
    arg: &str,
    tz: &Tz,
) -> Result<DateTime<Tz>, EvalError> {
    apply_operation_with_options(dt, op, arg, tz, EvalOptions::default())
}

/// Apply one named calendar operation to `dt` in timezone `tz`.
///
/// | Operation | Effect |
/// |---|---|
/// | `+`, `-` | shift by the quantity in `arg` (`1d`, `2h`, ...) |
/// | `start`, `end`, `startof<unit>`, `endof<unit>` | snap to the boundary of the second, minute, hour, day, week, month, quarter or year |
/// | `day N` | set the day of month, keeping the time |
/// | `time HH:MM[:SS]` | set the time of day, keeping the date |
/// | `round U`, `trunc U` | round half-up or floor to a day, hour or minute (empty = day) |
///
/// `day` and `time` with an empty argument return the input unchanged.
///
/// # Errors
///
/// Returns [`EvalError::UnknownOperation`] for an unknown name,
/// [`EvalError::InvalidArgument`] for a bad `day` or `time` argument, and
/// [`EvalError::UnknownUnit`] for a bad `round`/`trunc` unit.
pub fn apply_operation_with_options<Tz: TimeZone>(
    dt: &DateTime<Tz>,
    op: &str,
    arg: &str,
    tz: &Tz,
    options: EvalOptions,
) -> Result<DateTime<Tz>, EvalError> {
    trace!(op, arg, "applying operation");
    let local = dt.with_timezone(tz);
    let naive = local.naive_local();
    let invalid_arg = || EvalError::InvalidArgument {
        op: op.to_string(),
        value: arg.to_string(),
    };

    let target = match op {
        "+" | "-" => return apply_relative(&local, &format!("{op}{arg}"), tz),
        "day" | "time" if arg.is_empty() => return Ok(local),
        "day" => {
            let day: u32 = arg.parse().map_err(|_| invalid_arg())?;
            naive
                .date()
                .with_day(day)
                .ok_or_else(invalid_arg)?
                .and_time(naive.time())
        }
        "time" => {
            let time = parse_clock_time(arg).ok_or_else(invalid_arg)?;
            naive.date().and_time(time)
        }
        "round" | "trunc" => round_or_trunc(naive, op == "round", arg)?,
        _ => boundary(naive, op, options.week_start)?,
    };
    localize(tz, target)
}

const MAX_NANO: u32 = 999_999_999;

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, MAX_NANO).unwrap_or(NaiveTime::MIN)
}

fn boundary(
    naive: NaiveDateTime,
    op: &str,
    week_start: WeekStartDay,
) -> Result<NaiveDateTime, EvalError> {
    let date = naive.date();
    let (year, month) = (date.year(), date.month());
    let out_of_range = || EvalError::OutOfRange(format!("{op} of {naive}"));
    let on = |y: i32, m: u32, d: u32| NaiveDate::from_ymd_opt(y, m, d).ok_or_else(out_of_range);
    let at = |h: u32, m: u32, s: u32, nano: u32| {
        date.and_hms_nano_opt(h, m, s, nano).ok_or_else(out_of_range)
    };
    let result = match op {
        "start" | "startofday" => date.and_time(NaiveTime::MIN),
        "end" | "endofday" => date.and_time(end_of_day()),
        "startofweek" | "endofweek" => {
            let since_start = days_from_week_start(date.weekday(), week_start);
            let first = date
                .checked_sub_days(Days::new(since_start))
                .ok_or_else(out_of_range)?;
            if op == "startofweek" {
                first.and_time(NaiveTime::MIN)
            } else {
                first
                    .checked_add_days(Days::new(6))
                    .ok_or_else(out_of_range)?
                    .and_time(end_of_day())
            }
        }
        "startofmonth" => on(year, month, 1)?.and_time(NaiveTime::MIN),
        "endofmonth" => on(year, month, days_in_month(year, month))?.and_time(end_of_day()),
        "startofquarter" => on(year, (month - 1) / 3 * 3 + 1, 1)?.and_time(NaiveTime::MIN),
        "endofquarter" => {
            let last = (month - 1) / 3 * 3 + 3;
            on(year, last, days_in_month(year, last))?.and_time(end_of_day())
        }
        "startofyear" => on(year, 1, 1)?.and_time(NaiveTime::MIN),
        "endofyear" => on(year, 12, 31)?.and_time(end_of_day()),
        "startofhour" => at(naive.hour(), 0, 0, 0)?,
        "endofhour" => at(naive.hour(), 59, 59, MAX_NANO)?,
        "startofminute" => at(naive.hour(), naive.minute(), 0, 0)?,
        "endofminute" => at(naive.hour(), naive.minute(), 59, MAX_NANO)?,
        "startofsecond" => at(naive.hour(), naive.minute(), naive.second(), 0)?,
        "endofsecond" => at(naive.hour(), naive.minute(), naive.second(), MAX_NANO)?,
        other => return Err(EvalError::UnknownOperation(other.to_string())),
    };
    Ok(result)
}

fn round_or_trunc(
    naive: NaiveDateTime,
    round: bool,
    unit: &str,
) -> Result<NaiveDateTime, EvalError> {
    let date = naive.date();
    let floor = |h: u32, m: u32| {
        date.and_hms_opt(h, m, 0)
            .ok_or_else(|| EvalError::OutOfRange(naive.to_string()))
    };

    let (floored, step, half_up) = match unit {
        "" | "day" => (date.and_time(NaiveTime::MIN), Duration::days(1), naive.hour() >= 12),
        "hour" => (floor(naive.hour(), 0)?, Duration::hours(1), naive.minute() >= 30),
        "minute" => (
            floor(naive.hour(), naive.minute())?,
            Duration::minutes(1),
            naive.second() >= 30,
        ),
        other => return Err(EvalError::UnknownUnit(other.to_string())),
    };

    if round && half_up {
        floored
            .checked_add_signed(step)
            .ok_or_else(|| EvalError::OutOfRange(naive.to_string()))
    } else {
        Ok(floored)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
