//! Data sources that produce batches for a checkpoint.
//!
//! A source turns a declared [`Table`] into an immutable [`Batch`]. Sources are
//! read-only: nothing in dq-guard writes back to the data.

use crate::core::{Batch, Table};
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

#[cfg(feature = "postgres")]
mod database;
mod memory;
mod session;

#[cfg(feature = "postgres")]
pub use database::{PostgresConfig, PostgresSource};
pub use memory::MemorySource;
pub use session::SessionContextSource;

/// A source of table snapshots.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{SemanticType, Table};
/// use dq_guard::sources::{DataSource, MemorySource};
/// use std::sync::Arc;
///
/// # async fn example(source: MemorySource) -> dq_guard::error::Result<()> {
/// let users = Arc::new(
///     Table::builder("users")
///         .column("login_hash", SemanticType::Text)
///         .build()?,
/// );
/// let batch = source.fetch(&users).await?;
/// println!("{} rows", batch.num_rows());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Fetches the declared columns of `table` as one batch.
    ///
    /// Failures are reported as [`GuardError::DataSource`] naming the table.
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch>;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch> {
        (**self).fetch(table).await
    }

    fn description(&self) -> String {
        (**self).description()
    }
}
