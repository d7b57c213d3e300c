//! Benchmarks for expectation evaluation over the trades table.

use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dq_guard::core::{Batch, Evaluator, Expectation, ReferenceExtractor, SuiteRunner};
use dq_guard::presets::trading;
use std::hint::black_box;
use std::sync::Arc;

fn trades_batch(rows: usize) -> Batch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("login_hash", DataType::Utf8, true),
        Field::new("ticket_hash", DataType::Utf8, true),
        Field::new("server_hash", DataType::Utf8, true),
        Field::new("symbol", DataType::Utf8, true),
        Field::new("digits", DataType::Int64, true),
        Field::new("cmd", DataType::Int64, true),
        Field::new("volume", DataType::Float64, true),
        Field::new(
            "open_time",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(
            "close_time",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("contractsize", DataType::Float64, true),
    ]));

    let record_batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(
                (0..rows).map(|i| format!("{:X}", i % 500)).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                (0..rows).map(|i| format!("{i:08X}")).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                (0..rows).map(|i| format!("{:X}", i % 7)).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                (0..rows)
                    .map(|i| if i % 1000 == 0 { "USD,CHF" } else { "EURUSD" })
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                (0..rows).map(|i| (i % 12) as i64).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                (0..rows).map(|i| (i % 2) as i64).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                (0..rows).map(|i| i as f64 * 0.5).collect::<Vec<_>>(),
            )),
            Arc::new(TimestampMicrosecondArray::from(
                (0..rows).map(|i| i as i64 * 1_000_000).collect::<Vec<_>>(),
            )),
            Arc::new(TimestampMicrosecondArray::from(
                (0..rows)
                    .map(|i| i as i64 * 1_000_000 + if i % 50 == 0 { -1 } else { 60_000_000 })
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                (0..rows)
                    .map(|i| if i % 100 == 0 { None } else { Some(100_000.0) })
                    .collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap();

    Batch::try_new(Arc::new(trading::trades_table().unwrap()), &[record_batch]).unwrap()
}

fn bench_expectations(c: &mut Criterion) {
    let mut group = c.benchmark_group("expectations");
    let evaluator = Evaluator::default();
    let expectations = [
        ("not_null", Expectation::not_null("contractsize")),
        ("matches_regex", Expectation::matches_regex("ticket_hash", "^[A-F0-9]+$")),
        ("in_set", Expectation::in_set("cmd", [0i64, 1])),
        ("between", Expectation::between("digits", Some(0.0), Some(10.0))),
        (
            "column_greater_than",
            Expectation::column_greater_than("close_time", "open_time"),
        ),
    ];

    for rows in [10_000, 100_000] {
        let batch = trades_batch(rows);
        for (name, expectation) in &expectations {
            group.bench_with_input(BenchmarkId::new(*name, rows), &batch, |b, batch| {
                b.iter(|| evaluator.evaluate(black_box(expectation), black_box(batch)))
            });
        }
    }
    group.finish();
}

fn bench_reference_sets(c: &mut Criterion) {
    let batch = trades_batch(100_000);
    let extractor = ReferenceExtractor::unlimited();

    c.bench_function("reference_extract_login_hash", |b| {
        b.iter(|| extractor.extract(black_box(&batch), "login_hash").unwrap())
    });

    let reference = extractor.extract(&batch, "server_hash").unwrap();
    let membership = Expectation::in_reference_set("server_hash", reference);
    let evaluator = Evaluator::default();
    c.bench_function("in_reference_set_100k", |b| {
        b.iter(|| evaluator.evaluate(black_box(&membership), black_box(&batch)))
    });
}

fn bench_trades_suite(c: &mut Criterion) {
    let batch = trades_batch(100_000);
    let reference = |column: &str| {
        ReferenceExtractor::unlimited()
            .extract(&batch, column)
            .unwrap()
    };
    let server = reference("server_hash");
    let login = reference("login_hash");
    let suite = trading::trades_suite()
        .resolve(|r| {
            Ok(if r.column == "server_hash" {
                server.clone()
            } else {
                login.clone()
            })
        })
        .unwrap();
    let runner = SuiteRunner::default();

    c.bench_function("trades_suite_100k", |b| {
        b.iter(|| runner.run(black_box(&suite), black_box(&batch)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_expectations,
    bench_reference_sets,
    bench_trades_suite
);
criterion_main!(benches);
