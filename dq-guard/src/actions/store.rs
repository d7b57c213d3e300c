//! Persists checkpoint results as JSON files.

use super::ResultSink;
use crate::core::CheckpointResult;
use crate::prelude::*;
use crate::security::InputValidator;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Writes each result to `<dir>/<checkpoint>/<run_id>.json` as pretty JSON.
///
/// ```rust
/// use dq_guard::actions::StoreResultAction;
///
/// let action = StoreResultAction::new("results");
/// assert_eq!(action.directory().to_str(), Some("results"));
/// ```
#[derive(Debug, Clone)]
pub struct StoreResultAction {
    dir: PathBuf,
}

impl StoreResultAction {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path the given result is stored at.
    pub fn path_for(&self, result: &CheckpointResult) -> PathBuf {
        self.dir
            .join(result.name())
            .join(format!("{}.json", result.run_id()))
    }
}

#[async_trait]
impl ResultSink for StoreResultAction {
    fn name(&self) -> &str {
        "store_result"
    }

    #[instrument(skip(self, result), fields(run_id = %result.run_id(), dir = %self.dir.display()))]
    async fn submit(&self, result: &CheckpointResult) -> Result<()> {
        InputValidator::validate_file_name(result.name(), "checkpoint name").map_err(|e| {
            GuardError::result_sink(self.name(), e.to_string(), None)
        })?;
        let path = self.path_for(result);
        let json = serde_json::to_string_pretty(result)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GuardError::result_sink(
                    self.name(),
                    format!("cannot create directory {}", parent.display()),
                    Some(Box::new(e)),
                )
            })?;
        }
        tokio::fs::write(&path, json).await.map_err(|e| {
            GuardError::result_sink(
                self.name(),
                format!("cannot write {}", path.display()),
                Some(Box::new(e)),
            )
        })?;

        info!(path = %path.display(), "Stored checkpoint result");
        Ok(())
    }
}
