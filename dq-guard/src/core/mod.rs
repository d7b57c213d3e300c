//! Core types of the expectation engine.
//!
//! ## Overview
//!
//! - **[`Table`]** and **[`Batch`]**: the declared shape of a table and an immutable
//!   snapshot of its rows
//! - **[`Expectation`]**: a single rule over one table, evaluated by the [`Evaluator`]
//! - **[`SuiteDefinition`]** / **[`Suite`]**: the ordered expectations for one table,
//!   run by the [`SuiteRunner`]
//! - **[`ReferenceExtractor`]**: distinct column values of a validated batch, used as
//!   the allowed set of a later table's expectation
//! - **[`Checkpoint`]**: validates tables in order and hands the
//!   [`CheckpointResult`] to its actions
//!
//! ## Architecture
//!
//! ```text
//! Checkpoint
//!     ├── users  ── SuiteRunner ── Evaluator × N ── SuiteResult
//!     │             └── ReferenceExtractor (users.server_hash, users.login_hash)
//!     └── trades ── SuiteRunner ── Evaluator × N ── SuiteResult
//!                                                      │
//!                                    CheckpointResult ─┴─> ResultSink × M
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dq_guard::core::{Batch, Expectation, ExpectationStatus, SemanticType, Table, Value};
//! use std::sync::Arc;
//!
//! let table = Arc::new(
//!     Table::builder("trades")
//!         .column("digits", SemanticType::Integer)
//!         .build()
//!         .unwrap(),
//! );
//! let batch = Batch::from_rows(
//!     table,
//!     vec![vec![Some(Value::Integer(5))], vec![Some(Value::Integer(11))]],
//! )
//! .unwrap();
//!
//! let result = dq_guard::core::evaluate(
//!     &Expectation::between("digits", Some(0.0), Some(10.0)),
//!     &batch,
//! );
//! assert_eq!(result.status, ExpectationStatus::Failure);
//! assert_eq!(result.violation_count, 1);
//! ```

mod batch;
mod checkpoint;
mod evaluator;
mod expectation;
mod reference;
mod result;
mod suite;
mod table;
mod value;

pub use batch::{Batch, ColumnData};
pub use checkpoint::{Checkpoint, CheckpointBuilder, CheckpointConfig, CheckpointStep};
pub use evaluator::{evaluate, Evaluator, DEFAULT_SAMPLE_SIZE};
pub use expectation::{
    AllowedValues, ColumnRef, Expectation, ExpectationDefinition, ExpectationKind,
    ExpectationSummary,
};
pub use reference::{ReferenceExtractor, ReferenceSet};
pub use result::{
    CheckpointResult, CheckpointStatistics, ExpectationResult, ExpectationStatus, SuiteResult,
    Violation,
};
pub use suite::{RunnerConfig, Suite, SuiteDefinition, SuiteDefinitionBuilder, SuiteRunner};
pub use table::{ColumnDef, Table, TableBuilder};
pub use value::{SemanticType, Value};

pub(crate) use value::micros_to_datetime;
