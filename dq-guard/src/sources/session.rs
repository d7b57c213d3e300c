//! Data source over tables registered in a DataFusion session.

use super::DataSource;
use crate::core::{Batch, Table};
use crate::prelude::*;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches tables from a [`SessionContext`].
///
/// Anything DataFusion can register works: CSV, Parquet, JSON, `MemTable` or a
/// remote table provider. Only the declared columns are projected, with every
/// identifier validated and quoted.
///
/// ```rust,no_run
/// use datafusion::prelude::{CsvReadOptions, SessionContext};
/// use dq_guard::sources::SessionContextSource;
///
/// # async fn example() -> dq_guard::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("users", "data/users.csv", CsvReadOptions::new()).await?;
/// let source = SessionContextSource::new(ctx);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionContextSource {
    ctx: SessionContext,
    source_type: String,
}

impl std::fmt::Debug for SessionContextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContextSource")
            .field("source_type", &self.source_type)
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

impl SessionContextSource {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            source_type: "DataFusion".to_string(),
        }
    }

    /// Overrides the source type reported in errors and descriptions.
    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Builds the projection query for a table.
    ///
    /// `table_sql` is the already escaped relation name.
    pub(crate) fn projection_sql(table: &Table, table_sql: &str) -> Result<String> {
        let columns = table
            .columns()
            .iter()
            .map(|c| SqlSecurity::escape_identifier(&c.name))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("SELECT {} FROM {table_sql}", columns.join(", ")))
    }

    /// Runs a projection query and converts the result into a batch.
    pub(crate) async fn fetch_with(&self, table: &Arc<Table>, table_sql: &str) -> Result<Batch> {
        let sql = Self::projection_sql(table, table_sql)?;
        debug!(sql = %sql, "Executing projection query");

        let frame = self.ctx.sql(&sql).await.map_err(|e| {
            GuardError::data_source_with_source(
                table.name(),
                self.source_type.clone(),
                "failed to plan projection query",
                Box::new(e),
            )
        })?;
        let batches = frame.collect().await.map_err(|e| {
            GuardError::data_source_with_source(
                table.name(),
                self.source_type.clone(),
                "failed to read table",
                Box::new(e),
            )
        })?;

        Batch::try_new(Arc::clone(table), &batches)
    }
}

#[async_trait]
impl DataSource for SessionContextSource {
    #[instrument(skip(self, table), fields(table = %table.name(), source = %self.source_type))]
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch> {
        let table_sql = SqlSecurity::escape_qualified(table.name())?;
        self.fetch_with(table, &table_sql).await
    }

    fn description(&self) -> String {
        format!("{} session {}", self.source_type, self.ctx.session_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SemanticType, Value};
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    fn trades_table() -> Arc<Table> {
        Arc::new(
            Table::builder("trades")
                .column("symbol", SemanticType::Text)
                .column("digits", SemanticType::Integer)
                .build()
                .unwrap(),
        )
    }

    fn context() -> SessionContext {
        let schema = Arc::new(Schema::new(vec![
            Field::new("volume", DataType::Float64, true),
            Field::new("digits", DataType::Int64, true),
            Field::new("symbol", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(1.5), None])),
                Arc::new(Int64Array::from(vec![Some(5), Some(11)])),
                Arc::new(StringArray::from(vec![Some("EURUSD"), Some("USD,CHF")])),
            ],
        )
        .unwrap();
        let ctx = SessionContext::new();
        ctx.register_batch("trades", batch).unwrap();
        ctx
    }

    #[test]
    fn test_projection_sql() {
        let sql = SessionContextSource::projection_sql(&trades_table(), "\"trades\"").unwrap();
        assert_eq!(sql, "SELECT \"symbol\", \"digits\" FROM \"trades\"");
    }

    #[tokio::test]
    async fn test_fetch_projects_declared_columns() {
        let source = SessionContextSource::new(context());
        let batch = source.fetch(&trades_table()).await.unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert!(batch.column("volume").is_none());
        assert_eq!(
            batch.column("digits").unwrap().value(1),
            Some(Value::Integer(11))
        );
    }

    #[tokio::test]
    async fn test_fetch_missing_table() {
        let source = SessionContextSource::new(SessionContext::new()).with_source_type("csv");
        let err = source.fetch(&trades_table()).await.unwrap_err();
        match err {
            GuardError::DataSource {
                table, source_type, ..
            } => {
                assert_eq!(table, "trades");
                assert_eq!(source_type, "csv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsafe_identifiers() {
        let table = Arc::new(
            Table::builder("trades; DROP TABLE users")
                .column("symbol", SemanticType::Text)
                .build()
                .unwrap(),
        );
        let source = SessionContextSource::new(context());
        assert!(matches!(
            source.fetch(&table).await,
            Err(GuardError::SecurityError(_))
        ));
    }
}
