//! In-memory data source backed by Arrow record batches.

use super::DataSource;
use crate::core::{Batch, Table};
use crate::prelude::*;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Holds named record batches and serves them as table snapshots.
///
/// Batches may carry more columns than a table declares, and in any order; only
/// the declared columns are read.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<RecordBatch>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the batches of a table.
    pub fn register(&mut self, table: impl Into<String>, batches: Vec<RecordBatch>) {
        self.tables.insert(table.into(), batches);
    }

    /// Builder-style variant of [`MemorySource::register`].
    pub fn with_table(mut self, table: impl Into<String>, batches: Vec<RecordBatch>) -> Self {
        self.register(table, batches);
        self
    }

    /// Names of all registered tables, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl DataSource for MemorySource {
    #[instrument(skip(self, table), fields(table = %table.name()))]
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch> {
        let batches = self.tables.get(table.name()).ok_or_else(|| {
            GuardError::data_source(
                table.name(),
                "memory",
                format!("table '{}' is not registered", table.name()),
            )
        })?;
        debug!(pieces = batches.len(), "Serving in-memory batches");
        Batch::try_new(Arc::clone(table), batches)
    }

    fn description(&self) -> String {
        format!("in-memory source with {} tables", self.tables.len())
    }
}
