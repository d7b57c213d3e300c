//! Error types for dq-guard.
//!
//! Data-level outcomes (failed expectations, malformed expectation parameters) are
//! never errors: they are recorded in results. `GuardError` covers the faults that
//! stop a checkpoint from producing a report at all, plus the construction errors
//! raised while building batches and plans.

use crate::core::CheckpointResult;
use thiserror::Error;

/// The main error type for dq-guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A checkpoint plan or engine setting is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A cross-table expectation references a table that has not been validated yet.
    #[error("Dependency error in suite for '{table}': {message}")]
    Dependency {
        /// Table whose suite holds the offending reference
        table: String,
        /// Human-readable description of the ordering problem
        message: String,
    },

    /// A reference set would exceed the configured size limit.
    #[error(
        "Reference set for '{reference}' has more than {limit} distinct values; refusing to truncate"
    )]
    ReferenceSetTooLarge {
        /// Qualified `table.column` being extracted
        reference: String,
        /// Configured limit
        limit: usize,
    },

    /// Error from data source operations.
    #[error("Data source error for table '{table}': {message}")]
    DataSource {
        /// Table being fetched
        table: String,
        /// Type of data source (e.g., "memory", "datafusion", "PostgreSQL")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single result sink failed to accept a checkpoint result.
    #[error("Result sink '{action}' failed: {message}")]
    ResultSink {
        /// Name of the action
        action: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One or more post-run actions failed. The computed result is still available.
    #[error("{} checkpoint action(s) failed: {}", .failures.len(), ActionFailure::join(.failures))]
    ActionsFailed {
        /// Every action that failed, in execution order
        failures: Vec<ActionFailure>,
        /// The checkpoint result the actions were given
        result: Box<CheckpointResult>,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A declared column is missing from the data handed to a batch.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Data could not be represented as the declared semantic type.
    #[error("Type mismatch in column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, GuardError>`.
pub type Result<T> = std::result::Result<T, GuardError>;

/// A post-run action that returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    /// Name reported by the action
    pub action: String,
    /// Rendered error
    pub message: String,
}

impl ActionFailure {
    fn join(failures: &[ActionFailure]) -> String {
        failures
            .iter()
            .map(|f| format!("{}: {}", f.action, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl GuardError {
    /// Creates a new data source error.
    pub fn data_source(
        table: impl Into<String>,
        source_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DataSource {
            table: table.into(),
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        table: impl Into<String>,
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            table: table.into(),
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new result sink error with a source error.
    pub fn result_sink(
        action: impl Into<String>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ResultSink {
            action: action.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new dependency error.
    pub fn dependency(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dependency {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Returns the checkpoint result carried by an `ActionsFailed` error.
    pub fn checkpoint_result(&self) -> Option<&CheckpointResult> {
        match self {
            Self::ActionsFailed { result, .. } => Some(result),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            GuardError::Internal(inner) => GuardError::Internal(format!("{msg}: {inner}")),
            other => GuardError::Internal(format!("{msg}: {other}")),
        })
    }
}
