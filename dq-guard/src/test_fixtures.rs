//! Test fixtures: record batch helpers, trading sample data and failing
//! sources and sinks for fault-path tests.

use crate::actions::ResultSink;
use crate::core::{Batch, CheckpointResult, Table};
use crate::error::{GuardError, Result};
use crate::sources::{DataSource, MemorySource};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Builds a record batch of nullable Utf8 columns.
///
/// # Panics
///
/// Panics if the columns have different lengths.
pub fn record_batch(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// Microseconds since the epoch for `2024-03-01T00:00:00Z` plus `minutes`.
pub fn ts(minutes: i64) -> i64 {
    1_709_251_200_000_000 + minutes * 60_000_000
}

/// A clean `users` batch: two accounts on one server.
pub fn users_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("login_hash", DataType::Utf8, true),
        Field::new("server_hash", DataType::Utf8, true),
        Field::new("country_hash", DataType::Utf8, true),
        Field::new("currency", DataType::Utf8, true),
        Field::new("enable", DataType::Int64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["A1B2", "C3D4"])),
            Arc::new(StringArray::from(vec!["5E1F", "5E1F"])),
            Arc::new(StringArray::from(vec!["0A", "0B"])),
            Arc::new(StringArray::from(vec!["USD", "EUR"])),
            Arc::new(Int64Array::from(vec![1, 0])),
        ],
    )
    .unwrap()
}

/// A clean `trades` batch referencing the accounts of [`users_batch`].
pub fn trades_batch() -> RecordBatch {
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
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["A1B2", "C3D4", "A1B2"])),
            Arc::new(StringArray::from(vec!["7A01", "7A02", "7A03"])),
            Arc::new(StringArray::from(vec!["5E1F", "5E1F", "5E1F"])),
            Arc::new(StringArray::from(vec!["EURUSD", "USDCHF", "XAUUSD"])),
            Arc::new(Int64Array::from(vec![5, 5, 2])),
            Arc::new(Int64Array::from(vec![0, 1, 0])),
            Arc::new(Float64Array::from(vec![100.0, 0.0, 250.5])),
            Arc::new(TimestampMicrosecondArray::from(vec![ts(0), ts(10), ts(20)])),
            Arc::new(TimestampMicrosecondArray::from(vec![ts(5), ts(15), ts(90)])),
            Arc::new(Float64Array::from(vec![100_000.0, 100_000.0, 100.0])),
        ],
    )
    .unwrap()
}

/// A memory source serving [`users_batch`] and [`trades_batch`].
pub fn trading_source() -> MemorySource {
    MemorySource::new()
        .with_table("users", vec![users_batch()])
        .with_table("trades", vec![trades_batch()])
}

/// A source that fails for one table and serves empty batches for the others.
#[derive(Debug)]
pub struct FailingSource {
    failing_table: String,
    fetches: AtomicUsize,
}

impl FailingSource {
    pub fn new(failing_table: impl Into<String>) -> Self {
        Self {
            failing_table: failing_table.into(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of fetches attempted so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for FailingSource {
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if table.name() == self.failing_table {
            return Err(GuardError::data_source(
                table.name(),
                "failing",
                "connection reset",
            ));
        }
        Batch::try_new(Arc::clone(table), &[])
    }

    fn description(&self) -> String {
        format!("failing source ({})", self.failing_table)
    }
}

/// A sink that always fails.
#[derive(Debug)]
pub struct FailingSink {
    name: String,
}

impl FailingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ResultSink for FailingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, _result: &CheckpointResult) -> Result<()> {
        Err(GuardError::result_sink(&self.name, "sink unavailable", None))
    }
}
