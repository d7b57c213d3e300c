//! Suites and the suite runner.

use super::{
    Batch, ColumnRef, Evaluator, Expectation, ExpectationDefinition, ExpectationResult,
    ExpectationStatus, ReferenceSet, SuiteResult, Value, DEFAULT_SAMPLE_SIZE,
};
use crate::prelude::*;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Declarative suite: the expectations for one table, possibly referencing
/// columns of tables validated earlier in a checkpoint.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::SuiteDefinition;
///
/// let definition = SuiteDefinition::builder("trades_suite", "trades")
///     .not_null("ticket_hash")
///     .between("digits", Some(0.0), Some(10.0))
///     .in_reference_set("server_hash", "users", "server_hash")
///     .build();
///
/// assert_eq!(definition.references().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteDefinition {
    /// Suite name, used in reports
    pub name: String,
    /// Table the suite validates
    pub table: String,
    /// Expectations in evaluation order
    #[serde(default)]
    pub expectations: Vec<ExpectationDefinition>,
}

impl SuiteDefinition {
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> SuiteDefinitionBuilder {
        SuiteDefinitionBuilder {
            definition: SuiteDefinition {
                name: name.into(),
                table: table.into(),
                expectations: Vec::new(),
            },
        }
    }

    /// Parses a suite definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Columns of other tables this suite depends on, in declaration order.
    pub fn references(&self) -> impl Iterator<Item = &ColumnRef> {
        self.expectations.iter().filter_map(|e| e.reference())
    }

    /// Resolves every definition into an [`Expectation`].
    ///
    /// `resolver` supplies the reference set for each symbolic reference.
    pub fn resolve<F>(&self, mut resolver: F) -> Result<Suite>
    where
        F: FnMut(&ColumnRef) -> Result<ReferenceSet>,
    {
        let expectations = self
            .expectations
            .iter()
            .map(|definition| definition.resolve(&mut resolver))
            .collect::<Result<Vec<_>>>()?;
        Ok(Suite::new(&self.name, &self.table, expectations))
    }

    /// Resolves a suite that has no cross-table references.
    pub fn resolve_standalone(&self) -> Result<Suite> {
        self.resolve(|reference| {
            Err(GuardError::dependency(
                &self.table,
                format!("reference to '{reference}' needs a checkpoint to resolve"),
            ))
        })
    }
}

/// Builder for [`SuiteDefinition`].
#[derive(Debug)]
pub struct SuiteDefinitionBuilder {
    definition: SuiteDefinition,
}

impl SuiteDefinitionBuilder {
    /// Adds a definition as is.
    pub fn expectation(mut self, expectation: ExpectationDefinition) -> Self {
        self.definition.expectations.push(expectation);
        self
    }

    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.expectation(ExpectationDefinition::NotNull {
            column: column.into(),
        })
    }

    pub fn row_count_between(self, min: Option<u64>, max: Option<u64>) -> Self {
        self.expectation(ExpectationDefinition::RowCountBetween { min, max })
    }

    pub fn matches_regex(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.expectation(ExpectationDefinition::MatchesRegex {
            column: column.into(),
            pattern: pattern.into(),
        })
    }

    pub fn in_set<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.expectation(ExpectationDefinition::InSet {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Values of `column` must appear in `ref_table.ref_column`.
    pub fn in_reference_set(
        self,
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        self.expectation(ExpectationDefinition::InReferenceSet {
            column: column.into(),
            reference: ColumnRef::new(ref_table, ref_column),
        })
    }

    pub fn between(self, column: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.expectation(ExpectationDefinition::Between {
            column: column.into(),
            min,
            max,
        })
    }

    pub fn column_greater_than(
        self,
        column_a: impl Into<String>,
        column_b: impl Into<String>,
    ) -> Self {
        self.expectation(ExpectationDefinition::ColumnGreaterThan {
            column_a: column_a.into(),
            column_b: column_b.into(),
        })
    }

    pub fn build(self) -> SuiteDefinition {
        self.definition
    }
}

/// A resolved suite: an ordered list of expectations bound to one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    name: String,
    table: String,
    expectations: Vec<Expectation>,
}

impl Suite {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        expectations: Vec<Expectation>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            expectations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }
}

/// Settings for a [`SuiteRunner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Violations kept per expectation result
    pub sample_size: usize,
    /// Upper bound on expectations evaluated at once by `run_parallel`
    pub max_parallelism: usize,
    pub log: LogConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_parallelism: num_cpus::get(),
            log: LogConfig::default(),
        }
    }
}

/// Runs every expectation of a suite against one batch.
///
/// Expectations are independent: a failing or faulty one never stops the rest,
/// and results always come back in declaration order.
#[derive(Debug, Clone, Default)]
pub struct SuiteRunner {
    config: RunnerConfig,
}

impl SuiteRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.config.sample_size)
    }

    fn check_table(suite: &Suite, batch: &Batch) -> Result<()> {
        if suite.table() != batch.table().name() {
            return Err(GuardError::Configuration(format!(
                "suite '{}' targets table '{}' but the batch is of table '{}'",
                suite.name(),
                suite.table(),
                batch.table().name()
            )));
        }
        Ok(())
    }

    /// Evaluates the suite sequentially on the calling thread.
    #[instrument(skip(self, suite, batch), fields(
        suite.name = %suite.name(),
        suite.table = %suite.table(),
        suite.expectations = suite.expectations().len(),
        batch.rows = batch.num_rows()
    ))]
    pub fn run(&self, suite: &Suite, batch: &Batch) -> Result<SuiteResult> {
        Self::check_table(suite, batch)?;
        let start = Instant::now();
        let evaluator = self.evaluator();

        let results = suite
            .expectations()
            .iter()
            .map(|expectation| evaluator.evaluate(expectation, batch))
            .collect();

        Ok(self.finish(suite, batch, results, start))
    }

    /// Evaluates the suite on the blocking thread pool, at most
    /// `max_parallelism` expectations at a time.
    #[instrument(skip(self, suite, batch), fields(
        suite.name = %suite.name(),
        suite.table = %suite.table(),
        suite.expectations = suite.expectations().len(),
        batch.rows = batch.num_rows(),
        max_parallelism = self.config.max_parallelism
    ))]
    pub async fn run_parallel(&self, suite: Arc<Suite>, batch: Arc<Batch>) -> Result<SuiteResult> {
        Self::check_table(&suite, &batch)?;
        let start = Instant::now();
        let evaluator = self.evaluator();

        let tasks = (0..suite.expectations().len()).map(|index| {
            let suite = Arc::clone(&suite);
            let batch = Arc::clone(&batch);
            tokio::task::spawn_blocking(move || {
                evaluator.evaluate(&suite.expectations()[index], &batch)
            })
        });

        let joined: Vec<_> = stream::iter(tasks)
            .buffered(self.config.max_parallelism.max(1))
            .collect()
            .await;

        let results = joined
            .into_iter()
            .map(|task| {
                task.map_err(|e| GuardError::Internal(format!("expectation task failed: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.finish(&suite, &batch, results, start))
    }

    fn finish(
        &self,
        suite: &Suite,
        batch: &Batch,
        results: Vec<ExpectationResult>,
        start: Instant,
    ) -> SuiteResult {
        for result in &results {
            self.record(suite, result);
        }

        let result = SuiteResult::new(
            suite.name(),
            suite.table(),
            batch.num_rows() as u64,
            results,
        );
        info!(
            suite.name = %suite.name(),
            suite.table = %suite.table(),
            batch.rows = batch.num_rows(),
            expectations.passed = result.successful_count(),
            expectations.failed = result.failed_count(),
            expectations.errored = result.errored_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            suite.result = %if result.success() { "passed" } else { "failed" },
            "Validation suite completed"
        );
        result
    }

    fn record(&self, suite: &Suite, result: &ExpectationResult) {
        match result.status {
            ExpectationStatus::Success => {
                crate::log_expectation!(
                    self.config.log,
                    suite.name = %suite.name(),
                    expectation = %result.expectation,
                    evaluated = result.evaluated_count,
                    "Expectation passed"
                );
            }
            ExpectationStatus::Failure => {
                warn!(
                    suite.name = %suite.name(),
                    expectation = %result.expectation,
                    evaluated = result.evaluated_count,
                    violations = result.violation_count,
                    "Expectation failed"
                );
            }
            ExpectationStatus::Error => {
                error!(
                    suite.name = %suite.name(),
                    expectation = %result.expectation,
                    error = %result.message.as_deref().unwrap_or("unknown fault"),
                    error.type = "expectation_evaluation",
                    "Error evaluating expectation"
                );
            }
        }
    }
}
