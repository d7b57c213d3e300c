//! Result formatting for checkpoint reports.
//!
//! Formatters turn a [`CheckpointResult`] into JSON for machines, colourised text
//! for terminals, or Markdown for data docs.
//!
//! # Examples
//!
//! ```rust
//! use dq_guard::core::CheckpointResult;
//! use dq_guard::formatters::{HumanFormatter, ResultFormatter};
//!
//! let now = chrono::Utc::now();
//! let result = CheckpointResult::new("nightly", now, now, true, vec![]);
//! let output = HumanFormatter::new().format(&result).unwrap();
//! assert!(output.contains("Checkpoint PASSED"));
//! ```

use crate::core::{CheckpointResult, ExpectationResult, ExpectationStatus, SuiteResult, Violation};
use crate::logging::truncate_field;
use crate::prelude::*;
use std::fmt::{self, Write};

/// Sample values longer than this are cut in human and Markdown reports.
const MAX_SAMPLE_VALUE_LENGTH: usize = 80;

/// Configuration options for formatting checkpoint results.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the aggregate statistics block
    pub include_statistics: bool,
    /// Include expectations that passed
    pub include_passed: bool,
    /// Maximum number of sample violations shown per expectation
    pub max_samples: usize,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_statistics: true,
            include_passed: true,
            max_samples: 5,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only failures and no samples.
    pub fn minimal() -> Self {
        Self {
            include_statistics: true,
            include_passed: false,
            max_samples: 0,
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a detailed configuration showing everything.
    pub fn detailed() -> Self {
        Self {
            include_statistics: true,
            include_passed: true,
            max_samples: usize::MAX,
            use_colors: true,
            include_timestamps: true,
        }
    }

    /// Creates a configuration suitable for CI/CD environments.
    pub fn ci() -> Self {
        Self {
            include_statistics: true,
            include_passed: false,
            max_samples: 10,
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_passed(mut self, include: bool) -> Self {
        self.include_passed = include;
        self
    }

    pub fn with_max_samples(mut self, max: usize) -> Self {
        self.max_samples = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }
}

/// Trait for formatting checkpoint results into different output formats.
///
/// ```rust
/// use dq_guard::core::CheckpointResult;
/// use dq_guard::formatters::ResultFormatter;
///
/// struct OneLine;
///
/// impl ResultFormatter for OneLine {
///     fn format(&self, result: &CheckpointResult) -> dq_guard::prelude::Result<String> {
///         Ok(format!("{}: {}", result.name(), result.success()))
///     }
/// }
/// ```
pub trait ResultFormatter {
    /// Formats a checkpoint result into a string representation.
    fn format(&self, result: &CheckpointResult) -> Result<String>;

    /// Formats a checkpoint result with custom configuration.
    fn format_with_config(
        &self,
        result: &CheckpointResult,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(result)
    }
}

/// Formats checkpoint results as structured JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::detailed(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, result: &CheckpointResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &CheckpointResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut value = serde_json::to_value(result)?;
        filter_json(&mut value, config);

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered.map_err(|e| {
            GuardError::Internal(format!("Failed to serialize result to JSON: {e}"))
        })
    }
}

/// Drops the parts of a serialized result the configuration excludes.
fn filter_json(value: &mut serde_json::Value, config: &FormatterConfig) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    if !config.include_timestamps {
        object.remove("started_at");
        object.remove("finished_at");
    }
    if !config.include_statistics {
        object.remove("statistics");
    }

    let Some(suites) = object.get_mut("suites").and_then(|s| s.as_array_mut()) else {
        return;
    };
    for suite in suites {
        let Some(results) = suite.get_mut("results").and_then(|r| r.as_array_mut()) else {
            continue;
        };
        if !config.include_passed {
            results.retain(|r| r["status"] != "success");
        }
        for result in results {
            if let Some(samples) = result
                .get_mut("sample_violations")
                .and_then(|s| s.as_array_mut())
            {
                samples.truncate(config.max_samples);
            }
        }
    }
}

/// Formats checkpoint results for console output.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        &self,
        output: &mut String,
        result: &CheckpointResult,
        config: &FormatterConfig,
    ) -> fmt::Result {
        let paint = |text: &str, color: &str| {
            if config.use_colors {
                format!("\x1b[{color}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        writeln!(output)?;
        if !result.complete() {
            writeln!(output, "⏹️  {}", paint("Checkpoint INCOMPLETE (cancelled)", "33"))?;
        } else if result.success() {
            writeln!(output, "✅ {}", paint("Checkpoint PASSED", "32"))?;
        } else {
            writeln!(output, "❌ {}", paint("Checkpoint FAILED", "31"))?;
        }

        writeln!(output)?;
        writeln!(output, "Checkpoint: {}", result.name())?;
        writeln!(output, "Run: {}", result.run_id())?;
        if config.include_timestamps {
            writeln!(output, "Started: {}", result.started_at().to_rfc3339())?;
            writeln!(output, "Finished: {}", result.finished_at().to_rfc3339())?;
        }

        if config.include_statistics {
            let stats = result.statistics();
            writeln!(output)?;
            writeln!(output, "📊 Summary Statistics:")?;
            writeln!(output, "   Expectations: {}", stats.evaluated_expectations)?;
            writeln!(
                output,
                "   ✅ Passed: {}",
                paint(&stats.successful_expectations.to_string(), "32")
            )?;
            writeln!(
                output,
                "   ❌ Failed: {}",
                paint(&stats.failed_expectations.to_string(), "31")
            )?;
            writeln!(
                output,
                "   ⚠️  Errored: {}",
                paint(&stats.errored_expectations.to_string(), "33")
            )?;
            writeln!(output, "   Success Rate: {:.1}%", stats.success_percent)?;
        }

        for suite in result.suites() {
            writeln!(output)?;
            let verdict = if suite.success() {
                paint("PASSED", "32")
            } else {
                paint("FAILED", "31")
            };
            writeln!(
                output,
                "📋 Suite {} (table {}, {} rows): {verdict}",
                suite.suite_name(),
                suite.table_name(),
                suite.row_count()
            )?;

            for expectation in visible_results(suite, config) {
                match expectation.status {
                    ExpectationStatus::Success => {
                        writeln!(
                            output,
                            "   ✅ {} ({} evaluated)",
                            expectation.expectation, expectation.evaluated_count
                        )?;
                    }
                    ExpectationStatus::Failure => {
                        writeln!(
                            output,
                            "   ❌ {}: {} of {} evaluated rows violate",
                            paint(&expectation.expectation.to_string(), "31"),
                            expectation.violation_count,
                            expectation.evaluated_count
                        )?;
                        let samples = shown_samples(expectation, config);
                        for violation in samples {
                            writeln!(output, "      {}", render_violation(violation))?;
                        }
                        let hidden = expectation.violation_count as usize - samples.len();
                        if hidden > 0 && config.max_samples > 0 {
                            writeln!(output, "      ... and {hidden} more violations")?;
                        }
                    }
                    ExpectationStatus::Error => {
                        writeln!(
                            output,
                            "   ⚠️  {}: {}",
                            paint(&expectation.expectation.to_string(), "33"),
                            expectation.message.as_deref().unwrap_or("evaluation error")
                        )?;
                    }
                }
            }
        }

        writeln!(output)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, result: &CheckpointResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &CheckpointResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(&mut output, result, config)
            .map_err(|e| GuardError::Internal(format!("Failed to render report: {e}")))?;
        Ok(output)
    }
}

/// Formats checkpoint results as Markdown data docs.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default().with_colors(false),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn render(
        &self,
        output: &mut String,
        result: &CheckpointResult,
        config: &FormatterConfig,
    ) -> fmt::Result {
        let h = "#".repeat(self.heading_level as usize);

        let verdict = if !result.complete() {
            "⏹️ Checkpoint Report - INCOMPLETE"
        } else if result.success() {
            "✅ Checkpoint Report - PASSED"
        } else {
            "❌ Checkpoint Report - FAILED"
        };
        writeln!(output, "{h} {verdict}")?;
        writeln!(output)?;
        writeln!(output, "**Checkpoint:** {}", result.name())?;
        writeln!(output, "**Run:** `{}`", result.run_id())?;
        if config.include_timestamps {
            writeln!(output, "**Started:** {}", result.started_at().to_rfc3339())?;
            writeln!(output, "**Finished:** {}", result.finished_at().to_rfc3339())?;
        }

        if config.include_statistics {
            let stats = result.statistics();
            writeln!(output)?;
            writeln!(output, "{h}# Summary")?;
            writeln!(output)?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(output, "| Expectations | {} |", stats.evaluated_expectations)?;
            writeln!(output, "| Passed | {} |", stats.successful_expectations)?;
            writeln!(output, "| Failed | {} |", stats.failed_expectations)?;
            writeln!(output, "| Errored | {} |", stats.errored_expectations)?;
            writeln!(output, "| Success Rate | {:.1}% |", stats.success_percent)?;
        }

        for suite in result.suites() {
            writeln!(output)?;
            writeln!(
                output,
                "{h}# {} `{}` ({} rows)",
                if suite.success() { "✅" } else { "❌" },
                suite.table_name(),
                suite.row_count()
            )?;
            writeln!(output)?;
            writeln!(output, "Suite: {}", suite.suite_name())?;
            writeln!(output)?;
            writeln!(
                output,
                "| Status | Expectation | Parameters | Evaluated | Violations |"
            )?;
            writeln!(
                output,
                "|--------|-------------|------------|-----------|------------|"
            )?;

            let shown: Vec<&ExpectationResult> = visible_results(suite, config).collect();
            for expectation in &shown {
                let parameters = serde_json::to_string(&expectation.expectation.parameters)
                    .unwrap_or_default();
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {} |",
                    status_emoji(expectation.status),
                    markdown_cell(&expectation.expectation.to_string()),
                    markdown_cell(&parameters),
                    expectation.evaluated_count,
                    expectation.violation_count
                )?;
            }

            for expectation in shown.iter().filter(|e| !e.status.is_success()) {
                writeln!(output)?;
                writeln!(
                    output,
                    "{h}## {} {}",
                    status_emoji(expectation.status),
                    expectation.expectation
                )?;
                writeln!(output)?;
                if let Some(message) = &expectation.message {
                    writeln!(output, "- **Message:** {message}")?;
                }
                for violation in shown_samples(expectation, config) {
                    writeln!(output, "- `{}`", render_violation(violation))?;
                }
            }
        }

        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, result: &CheckpointResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &CheckpointResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(&mut output, result, config)
            .map_err(|e| GuardError::Internal(format!("Failed to render report: {e}")))?;
        Ok(output)
    }
}

fn visible_results<'a>(
    suite: &'a SuiteResult,
    config: &'a FormatterConfig,
) -> impl Iterator<Item = &'a ExpectationResult> {
    suite
        .results()
        .iter()
        .filter(move |r| config.include_passed || !r.status.is_success())
}

fn shown_samples<'a>(result: &'a ExpectationResult, config: &FormatterConfig) -> &'a [Violation] {
    let count = result.sample_violations.len().min(config.max_samples);
    &result.sample_violations[..count]
}

fn render_violation(violation: &Violation) -> String {
    let values = violation
        .values
        .iter()
        .map(|v| {
            v.as_ref().map_or_else(
                || "null".to_string(),
                |v| truncate_field(&v.to_string(), MAX_SAMPLE_VALUE_LENGTH),
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    match violation.row {
        Some(row) => format!("row {row}: {values}"),
        None => format!("table: {values}"),
    }
}

fn status_emoji(status: ExpectationStatus) -> &'static str {
    match status {
        ExpectationStatus::Success => "✅",
        ExpectationStatus::Failure => "❌",
        ExpectationStatus::Error => "⚠️",
    }
}

fn markdown_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
