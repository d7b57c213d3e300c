//! PostgreSQL data source using datafusion-table-providers.
//!
//! Tables are registered lazily as DataFusion table providers on first fetch and
//! read through the same projection path as [`SessionContextSource`].

use super::{DataSource, SessionContextSource};
use crate::core::{Batch, Table};
use crate::prelude::*;
use crate::security::{SecureString, SqlSecurity};
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use datafusion_table_providers::{
    postgres::PostgresTableFactory, sql::db_connection_pool::postgrespool::PostgresConnectionPool,
    util::secrets::to_secret_map,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

const SOURCE_TYPE: &str = "PostgreSQL";

/// PostgreSQL connection parameters.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: SecureString,
    /// `disable`, `prefer`, `require`, ...
    pub sslmode: Option<String>,
}

impl PostgresConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: SecureString::new(password.into()),
            sslmode: Some("disable".to_string()),
        }
    }

    pub fn with_sslmode(mut self, sslmode: impl Into<String>) -> Self {
        self.sslmode = Some(sslmode.into());
        self
    }

    fn connection_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("host".to_string(), self.host.clone());
        params.insert("port".to_string(), self.port.to_string());
        params.insert("db".to_string(), self.database.clone());
        params.insert("user".to_string(), self.username.clone());
        params.insert("pass".to_string(), self.password.expose().to_string());
        if let Some(ref ssl) = self.sslmode {
            params.insert("sslmode".to_string(), ssl.clone());
        }
        params
    }
}

/// Reads checkpoint tables from a PostgreSQL database.
///
/// ```rust,ignore
/// use dq_guard::sources::{PostgresConfig, PostgresSource};
///
/// let source = PostgresSource::new(
///     PostgresConfig::new("localhost", 5432, "trading", "analyst", "secret"),
/// );
/// ```
pub struct PostgresSource {
    config: PostgresConfig,
    pool: OnceCell<Arc<PostgresConnectionPool>>,
    session: SessionContextSource,
}

impl std::fmt::Debug for PostgresSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSource")
            .field("config", &self.config)
            .field("connected", &self.pool.initialized())
            .finish()
    }
}

impl PostgresSource {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
            session: SessionContextSource::new(SessionContext::new())
                .with_source_type(SOURCE_TYPE),
        }
    }

    async fn pool(&self, table: &str) -> Result<Arc<PostgresConnectionPool>> {
        self.pool
            .get_or_try_init(|| async {
                info!(
                    host = %self.config.host,
                    port = self.config.port,
                    database = %self.config.database,
                    "Connecting to PostgreSQL"
                );
                let pool = PostgresConnectionPool::new(to_secret_map(
                    self.config.connection_params(),
                ))
                .await
                .map_err(|e| {
                    GuardError::data_source_with_source(
                        table,
                        SOURCE_TYPE,
                        "failed to create PostgreSQL connection pool",
                        Box::new(e),
                    )
                })?;
                Ok(Arc::new(pool))
            })
            .await
            .cloned()
    }

    /// Registers the remote table with the session unless it already is.
    async fn ensure_registered(&self, table: &Table) -> Result<()> {
        let local = TableReference::bare(table.name());
        let ctx = self.session.context();
        if ctx.table_exist(local.clone())? {
            return Ok(());
        }

        let factory = PostgresTableFactory::new(self.pool(table.name()).await?);
        let provider = factory
            .table_provider(TableReference::from(table.name()))
            .await
            .map_err(|e| {
                GuardError::data_source(
                    table.name(),
                    SOURCE_TYPE,
                    format!("failed to create table provider: {e}"),
                )
            })?;

        ctx.register_table(local, provider).map_err(|e| {
            GuardError::data_source_with_source(
                table.name(),
                SOURCE_TYPE,
                "failed to register table",
                Box::new(e),
            )
        })?;
        Ok(())
    }
}

#[async_trait]
impl DataSource for PostgresSource {
    #[instrument(skip(self, table), fields(table = %table.name(), database = %self.config.database))]
    async fn fetch(&self, table: &Arc<Table>) -> Result<Batch> {
        let table_sql = SqlSecurity::escape_identifier(table.name())?;
        self.ensure_registered(table).await?;
        self.session.fetch_with(table, &table_sql).await
    }

    fn description(&self) -> String {
        format!(
            "{SOURCE_TYPE} database '{}' at {}:{}",
            self.config.database, self.config.host, self.config.port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config() {
        let config = PostgresConfig::new("localhost", 5432, "trading", "analyst", "secret")
            .with_sslmode("require");
        let params = config.connection_params();
        assert_eq!(params["db"], "trading");
        assert_eq!(params["pass"], "secret");
        assert_eq!(params["sslmode"], "require");
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_postgres_source_description() {
        let source = PostgresSource::new(PostgresConfig::new(
            "db.internal",
            5432,
            "trading",
            "analyst",
            "secret",
        ));
        assert_eq!(
            source.description(),
            "PostgreSQL database 'trading' at db.internal:5432"
        );
        assert!(format!("{source:?}").contains("connected: false"));
    }
}
