//! Prelude for commonly used types and traits in dq-guard.

pub use crate::actions::ResultSink;
pub use crate::core::{Checkpoint, CheckpointConfig, CheckpointResult, SuiteDefinition, Table};
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::sources::DataSource;
