//! End-to-end scenarios through the public API.

use calcdate_engine::{
    evaluate_expression, evaluate_range_expression, evaluate_transform, iterate_expression,
    parse_transform, CalcError, EvalContext, EvalError, EvalOptions, IterationError, ParseError,
    WeekStartDay,
};
use chrono::{DateTime, Utc};

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// Wednesday 2024-01-17 15:45:30 UTC.
fn ctx() -> EvalContext<Utc> {
    EvalContext::new(utc("2024-01-17T15:45:30Z"), Utc)
}

fn eval(input: &str) -> DateTime<Utc> {
    evaluate_expression(input, &ctx()).unwrap()
}

#[test]
fn iso_date_is_midnight() {
    assert_eq!(eval("2024-01-15"), utc("2024-01-15T00:00:00Z"));
}

#[test]
fn piped_day_shift() {
    assert_eq!(eval("2024-01-15|+1d"), utc("2024-01-16T00:00:00Z"));
}

#[test]
fn shift_then_end_of_month() {
    assert_eq!(
        eval("2024-01-15 +1d | endOfMonth"),
        utc("2024-01-31T23:59:59.999999999Z")
    );
}

#[test]
fn shift_then_start_of_month() {
    assert_eq!(
        eval("2024-01-15 +1M | startOfMonth"),
        utc("2024-02-01T00:00:00Z")
    );
}

#[test]
fn month_shift_clamps_to_shorter_month() {
    assert_eq!(
        eval("2022-03-31 23:59:59 +1M"),
        utc("2022-04-30T23:59:59Z")
    );
}

#[test]
fn transform_reshapes_interval() {
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
fn now_with_rounding() {
    assert_eq!(eval("now | +2h | round hour"), utc("2024-01-17T18:00:00Z"));
}

#[test]
fn next_weekday_at_time() {
    assert_eq!(eval("friday | time 09:00"), utc("2024-01-19T09:00:00Z"));
}

#[test]
fn bare_and_piped_forms_agree() {
    let pairs = [
        ("today +1d", "today | +1d"),
        ("now -3h startOfHour", "now | -3h | startOfHour"),
        ("tomorrow + 2w endOfWeek", "tomorrow | +2w | endOfWeek"),
    ];
    for (bare, piped) in pairs {
        assert_eq!(eval(bare), eval(piped), "{bare}");
    }
}

#[test]
fn sunday_week_start() {
    let ctx = ctx().with_options(EvalOptions {
        week_start: WeekStartDay::Sunday,
    });
    assert_eq!(
        evaluate_expression("today | endOfWeek", &ctx).unwrap(),
        utc("2024-01-20T23:59:59.999999999Z")
    );
}

#[test]
fn named_timezone_evaluation() {
    let ctx = EvalContext::new(utc("2024-07-01T12:00:00Z"), chrono_tz::America::New_York);
    let dt = evaluate_expression("today | time 09:30", &ctx).unwrap();
    assert_eq!(dt.with_timezone(&Utc), utc("2024-07-01T13:30:00Z"));
}

#[test]
fn explicit_offset_overrides_context_timezone() {
    let ctx = EvalContext::new(utc("2024-07-01T12:00:00Z"), chrono_tz::Asia::Tokyo);
    let dt = evaluate_expression("2024-01-15T10:30:00 PST", &ctx).unwrap();
    assert_eq!(dt.with_timezone(&Utc), utc("2024-01-15T18:30:00Z"));
}

#[test]
fn range_with_end_pipeline() {
    let (start, end) =
        evaluate_range_expression("2024-01-15...+7d | endOfMonth", &ctx()).unwrap();
    assert_eq!(start, utc("2024-01-15T00:00:00Z"));
    assert_eq!(end, utc("2024-01-31T23:59:59.999999999Z"));
}

#[test]
fn iterate_weekly_with_transform() {
    let results = iterate_expression(
        "2024-01-01...2024-01-29",
        "1w",
        Some("$begin +9h, $begin +17h"),
        &ctx(),
    )
    .unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[3].begin, utc("2024-01-22T09:00:00Z"));
    assert_eq!(results[3].end, utc("2024-01-22T17:00:00Z"));
    assert_eq!(results[3].index, 3);
}

#[test]
fn iterate_single_value_without_interval() {
    let results = iterate_expression("2024-01-15", "", None, &ctx()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].begin, utc("2024-01-15T00:00:00Z"));
    assert_eq!(results[0].end, utc("2024-01-15T00:00:00Z"));
}

#[test]
fn iterate_single_value_with_interval_is_error() {
    assert_eq!(
        iterate_expression("today", "1d", None, &ctx()).unwrap_err(),
        CalcError::Iteration(IterationError::IntervalWithoutRange)
    );
}

#[test]
fn iterate_reports_bad_transform() {
    let err = iterate_expression("today...tomorrow", "1h", Some("$begin +8h"), &ctx()).unwrap_err();
    assert_eq!(err, CalcError::Parse(ParseError::InvalidTransform(1)));
}

#[test]
fn errors_surface_through_umbrella() {
    assert!(matches!(
        evaluate_expression("today &", &ctx()).unwrap_err(),
        CalcError::Parse(ParseError::Lex(_))
    ));
    assert!(matches!(
        evaluate_expression("today | endOfDecade", &ctx()).unwrap_err(),
        CalcError::Parse(ParseError::UnexpectedToken(ref t)) if t.text == "endOfDecade" && t.pos == 8
    ));
    assert_eq!(
        evaluate_expression("today...tomorrow", &ctx()).unwrap_err(),
        CalcError::Eval(EvalError::RangeNotSingleValue)
    );
}
