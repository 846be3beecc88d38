use calcdate_engine::{evaluate, iterate_expression, parse, tokenize, EvalContext};
use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const EXPRESSIONS: &[&str] = &[
    "today +1d",
    "now | +2h | round hour",
    "2024-01-15T10:30:00+05:30 | endOfMonth",
    "2024-01-15...+7d | endOfMonth",
];

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize", |b| {
        b.iter(|| {
            for expr in EXPRESSIONS {
                black_box(tokenize(black_box(expr)).unwrap());
            }
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| {
            for expr in EXPRESSIONS {
                black_box(parse(black_box(expr)).unwrap());
            }
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let ctx = EvalContext::new(Utc.with_ymd_and_hms(2024, 1, 17, 15, 45, 30).unwrap(), Utc);
    let expr = parse("2024-01-15 +1M | endOfMonth | round day").unwrap();
    c.bench_function("evaluate", |b| {
        b.iter(|| black_box(evaluate(black_box(&expr), &ctx).unwrap()))
    });
}

fn bench_iterate(c: &mut Criterion) {
    let ctx = EvalContext::new(Utc.with_ymd_and_hms(2024, 1, 17, 15, 45, 30).unwrap(), Utc);
    let mut group = c.benchmark_group("iterate");
    group.bench_function("hourly_year", |b| {
        b.iter(|| {
            black_box(
                iterate_expression("2024-01-01...2024-12-31", "1h", None, &ctx).unwrap(),
            )
        })
    });
    group.bench_function("daily_with_transform", |b| {
        b.iter(|| {
            black_box(
                iterate_expression(
                    "2024-01-01...2024-12-31",
                    "1d",
                    Some("$begin +9h, $begin +17h"),
                    &ctx,
                )
                .unwrap(),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_parse, bench_evaluate, bench_iterate);
criterion_main!(benches);
