//! Renders checkpoint results into report files.

use super::ResultSink;
use crate::core::CheckpointResult;
use crate::formatters::{MarkdownFormatter, ResultFormatter};
use crate::prelude::*;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Renders each result with a [`ResultFormatter`] and overwrites `path` with it.
///
/// The default renders Markdown data docs.
pub struct RenderReportAction {
    path: PathBuf,
    formatter: Box<dyn ResultFormatter + Send + Sync>,
}

impl std::fmt::Debug for RenderReportAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderReportAction")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RenderReportAction {
    /// Creates a Markdown report action.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_formatter(path, MarkdownFormatter::new())
    }

    pub fn with_formatter(
        path: impl Into<PathBuf>,
        formatter: impl ResultFormatter + Send + Sync + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            formatter: Box::new(formatter),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for RenderReportAction {
    fn name(&self) -> &str {
        "render_report"
    }

    #[instrument(skip(self, result), fields(run_id = %result.run_id(), path = %self.path.display()))]
    async fn submit(&self, result: &CheckpointResult) -> Result<()> {
        let report = self.formatter.format(result)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GuardError::result_sink(
                    self.name(),
                    format!("cannot create directory {}", parent.display()),
                    Some(Box::new(e)),
                )
            })?;
        }
        tokio::fs::write(&self.path, report).await.map_err(|e| {
            GuardError::result_sink(
                self.name(),
                format!("cannot write {}", self.path.display()),
                Some(Box::new(e)),
            )
        })?;

        info!("Rendered checkpoint report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::{FormatterConfig, JsonFormatter};
    use chrono::Utc;

    #[tokio::test]
    async fn test_render_markdown_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs").join("index.md");
        let action = RenderReportAction::new(&path);
        let now = Utc::now();
        let result = CheckpointResult::new("trading", now, now, true, vec![]);

        action.submit(&result).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("## ✅ Checkpoint Report - PASSED"));
    }

    #[tokio::test]
    async fn test_render_with_custom_formatter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let action = RenderReportAction::with_formatter(
            &path,
            JsonFormatter::with_config(FormatterConfig::minimal()).with_pretty(false),
        );
        let now = Utc::now();
        let result = CheckpointResult::new("trading", now, now, false, vec![]);

        action.submit(&result).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["complete"], false);
        assert!(parsed.get("started_at").is_none());
        assert!(format!("{action:?}").contains("report.json"));
    }
}
