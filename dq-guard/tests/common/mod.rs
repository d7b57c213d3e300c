//! Shared helpers for dq-guard integration tests.

#![allow(dead_code)]

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use dq_guard::core::{Batch, Table};
use dq_guard::error::Result;
use dq_guard::sources::{DataSource, MemorySource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// One typed column of a test batch.
pub enum Col {
    Text(&'static str, Vec<Option<&'static str>>),
    Int(&'static str, Vec<Option<i64>>),
    Real(&'static str, Vec<Option<f64>>),
    Ts(&'static str, Vec<Option<i64>>),
}

pub fn batch(columns: Vec<Col>) -> RecordBatch {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for column in columns {
        match column {
            Col::Text(name, values) => {
                fields.push(Field::new(name, DataType::Utf8, true));
                arrays.push(Arc::new(StringArray::from(values)));
            }
            Col::Int(name, values) => {
                fields.push(Field::new(name, DataType::Int64, true));
                arrays.push(Arc::new(Int64Array::from(values)));
            }
            Col::Real(name, values) => {
                fields.push(Field::new(name, DataType::Float64, true));
                arrays.push(Arc::new(Float64Array::from(values)));
            }
            Col::Ts(name, values) => {
                fields.push(Field::new(
                    name,
                    DataType::Timestamp(TimeUnit::Microsecond, None),
                    true,
                ));
                arrays.push(Arc::new(TimestampMicrosecondArray::from(values)));
            }
        }
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// Microseconds for `2024-03-01T00:00:00Z` plus `minutes`.
pub fn ts(minutes: i64) -> i64 {
    1_709_251_200_000_000 + minutes * 60_000_000
}

pub fn users_batch(
    login: Vec<Option<&'static str>>,
    server: Vec<Option<&'static str>>,
) -> RecordBatch {
    let n = login.len();
    batch(vec![
        Col::Text("login_hash", login),
        Col::Text("server_hash", server),
        Col::Text("country_hash", vec![Some("0A"); n]),
        Col::Text("currency", vec![Some("USD"); n]),
        Col::Int("enable", vec![Some(1); n]),
    ])
}

/// A trades batch where every column not given is valid.
pub struct Trades {
    pub login: Vec<Option<&'static str>>,
    pub server: Vec<Option<&'static str>>,
    pub symbol: Vec<Option<&'static str>>,
    pub digits: Vec<Option<i64>>,
    pub open: Vec<Option<i64>>,
    pub close: Vec<Option<i64>>,
}

impl Trades {
    pub fn valid(n: usize) -> Self {
        Self {
            login: vec![Some("A1"); n],
            server: vec![Some("5E"); n],
            symbol: vec![Some("EURUSD"); n],
            digits: vec![Some(5); n],
            open: (0..n as i64).map(|i| Some(ts(i))).collect(),
            close: (0..n as i64).map(|i| Some(ts(i + 30))).collect(),
        }
    }

    pub fn batch(self) -> RecordBatch {
        let n = self.login.len();
        batch(vec![
            Col::Text("login_hash", self.login),
            Col::Text("ticket_hash", vec![Some("7A"); n]),
            Col::Text("server_hash", self.server),
            Col::Text("symbol", self.symbol),
            Col::Int("digits", self.digits),
            Col::Int("cmd", vec![Some(0); n]),
            Col::Real("volume", vec![Some(1.0); n]),
            Col::Ts("open_time", self.open),
            Col::Ts("close_time", self.close),
            Col::Real("contractsize", vec![Some(100_000.0); n]),
        ])
    }
}

pub fn trading_source(users: RecordBatch, trades: RecordBatch) -> MemorySource {
    MemorySource::new()
        .with_table("users", vec![users])
        .with_table("trades", vec![trades])
}

/// Wraps a source, recording fetches and optionally raising cancellation after
/// a given table has been fetched.
#[derive(Debug)]
pub struct ObservedSource<S> {
    inner: S,
    fetched: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    cancel_after: Option<(String, watch::Sender<bool>)>,
}

impl<S: DataSource> ObservedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetched: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    pub fn cancel_after(mut self, table: &str, sender: watch::Sender<bool>) -> Self {
        self.cancel_after = Some((table.to_string(), sender));
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: DataSource> DataSource for ObservedSource<S> {
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(table.name().to_string());
        let batch = self.inner.fetch(table).await?;
        if let Some((name, sender)) = &self.cancel_after {
            if name == table.name() {
                sender.send(true).unwrap();
            }
        }
        Ok(batch)
    }

    fn description(&self) -> String {
        format!("observed {}", self.inner.description())
    }
}
