//! # dq-guard - Expectation-based data quality checkpoints
//!
//! dq-guard validates relational tables against declarative rules
//! ("expectations") and reports, per table and per rule, how many rows were
//! looked at and which of them violated the rule. Rules may reference the values
//! of a table validated earlier in the same checkpoint, so cross-table
//! integrity checks ("every trade belongs to a known account") need no joins.
//!
//! ## Overview
//!
//! - [`core`]: tables, batches, expectations, suites, the evaluator and the checkpoint
//! - [`sources`]: where batches come from (memory, any DataFusion table, PostgreSQL)
//! - [`actions`]: what happens to a finished result (stored as JSON, rendered as a report)
//! - [`formatters`]: JSON, console and Markdown renderings of a result
//! - [`presets`]: the trading `users` / `trades` checkpoint
//!
//! ## Quick Start
//!
//! ```rust
//! use dq_guard::core::{Checkpoint, SemanticType, SuiteDefinition, Table};
//! use dq_guard::sources::MemorySource;
//! use arrow::array::StringArray;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let users = Arc::new(
//!     Table::builder("users")
//!         .column("currency", SemanticType::Text)
//!         .build()?,
//! );
//! let suite = SuiteDefinition::builder("users_suite", "users")
//!     .not_null("currency")
//!     .in_set("currency", ["AUD", "EUR", "NZD", "USD"])
//!     .build();
//!
//! let batch = RecordBatch::try_new(
//!     Arc::new(Schema::new(vec![Field::new("currency", DataType::Utf8, true)])),
//!     vec![Arc::new(StringArray::from(vec!["USD", "usd"]))],
//! )?;
//! let source = MemorySource::new().with_table("users", vec![batch]);
//!
//! let checkpoint = Checkpoint::builder("nightly").table(users, suite).build()?;
//! let result = checkpoint.run(&source).await?;
//!
//! assert!(!result.success());
//! let users = result.suite("users").unwrap();
//! assert_eq!(users.results()[1].violation_count, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Everything is instrumented with `tracing`. Binaries can install a subscriber
//! through [`logging::setup::init_logging`]; the amount of per-expectation detail
//! is controlled by [`logging::LogConfig`] on the
//! [`CheckpointConfig`](core::CheckpointConfig).

pub mod actions;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod presets;
pub mod security;
pub mod sources;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
