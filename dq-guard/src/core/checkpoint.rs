//! Checkpoints: ordered multi-table validation runs.

use super::{
    CheckpointResult, ColumnRef, ReferenceExtractor, ReferenceSet, RunnerConfig, SuiteDefinition,
    SuiteRunner, Table, DEFAULT_SAMPLE_SIZE,
};
use crate::actions::ResultSink;
use crate::error::ActionFailure;
use crate::prelude::*;
use crate::security::InputValidator;
use crate::sources::DataSource;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Engine settings for a checkpoint run.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    /// Violations kept per expectation result
    pub sample_size: usize,
    /// Largest reference set extracted before the run is aborted; `None` disables the limit
    pub max_reference_set_size: Option<usize>,
    /// Evaluate the expectations of one suite concurrently
    pub parallel_expectations: bool,
    /// Upper bound on concurrently evaluated expectations
    pub max_parallelism: usize,
    pub log: LogConfig,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_reference_set_size: Some(1_000_000),
            parallel_expectations: false,
            max_parallelism: num_cpus::get(),
            log: LogConfig::default(),
        }
    }
}

impl CheckpointConfig {
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_max_reference_set_size(mut self, limit: Option<usize>) -> Self {
        self.max_reference_set_size = limit;
        self
    }

    pub fn with_parallel_expectations(mut self, enabled: bool) -> Self {
        self.parallel_expectations = enabled;
        self
    }

    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// The subset of settings the suite runner uses.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            sample_size: self.sample_size,
            max_parallelism: self.max_parallelism,
            log: self.log.clone(),
        }
    }
}

/// One table of a checkpoint and the suite that validates it.
#[derive(Debug, Clone)]
pub struct CheckpointStep {
    pub table: Arc<Table>,
    pub suite: SuiteDefinition,
}

/// An ordered list of tables to validate, plus the actions that receive the report.
///
/// Tables are validated strictly in order. A suite may only reference columns of
/// tables that come before it; the referenced values are extracted from the
/// earlier batch right after it is validated.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Checkpoint, SemanticType, SuiteDefinition, Table};
/// use dq_guard::sources::MemorySource;
/// use std::sync::Arc;
///
/// # async fn example(source: MemorySource) -> dq_guard::error::Result<()> {
/// let users = Arc::new(
///     Table::builder("users")
///         .column("login_hash", SemanticType::Text)
///         .build()?,
/// );
/// let checkpoint = Checkpoint::builder("nightly")
///     .table(
///         users,
///         SuiteDefinition::builder("users_suite", "users")
///             .not_null("login_hash")
///             .build(),
///     )
///     .build()?;
///
/// let result = checkpoint.run(&source).await?;
/// println!("success: {}", result.success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Checkpoint {
    name: String,
    steps: Vec<CheckpointStep>,
    actions: Vec<Arc<dyn ResultSink>>,
    config: CheckpointConfig,
}

impl Checkpoint {
    pub fn builder(name: impl Into<String>) -> CheckpointBuilder {
        CheckpointBuilder {
            name: name.into(),
            steps: Vec::new(),
            actions: Vec::new(),
            config: CheckpointConfig::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[CheckpointStep] {
        &self.steps
    }

    pub fn actions(&self) -> &[Arc<dyn ResultSink>] {
        &self.actions
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Checks the plan without touching any data.
    ///
    /// Tables must be unique, each suite must target its step's table, and every
    /// reference must name a declared column of an earlier table.
    pub fn validate_plan(&self) -> Result<()> {
        let mut seen: HashMap<&str, &Table> = HashMap::new();
        for step in &self.steps {
            let table = step.table.name();
            if step.suite.table != table {
                return Err(GuardError::Configuration(format!(
                    "suite '{}' targets table '{}' but is attached to table '{table}'",
                    step.suite.name, step.suite.table
                )));
            }

            for reference in step.suite.references() {
                let Some(source) = seen.get(reference.table.as_str()) else {
                    let position = if reference.table == table
                        || self.steps.iter().any(|s| s.table.name() == reference.table)
                    {
                        "is not validated before it"
                    } else {
                        "is not part of the checkpoint"
                    };
                    return Err(GuardError::dependency(
                        table,
                        format!(
                            "expectation on '{table}' references '{reference}', but table '{}' {position}",
                            reference.table
                        ),
                    ));
                };
                if source.column_type(&reference.column).is_none() {
                    return Err(GuardError::Configuration(format!(
                        "reference '{reference}' names a column that table '{}' does not declare",
                        reference.table
                    )));
                }
            }

            if seen.insert(table, &step.table).is_some() {
                return Err(GuardError::Configuration(format!(
                    "table '{table}' appears twice in checkpoint '{}'",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Reference columns each table must supply to later suites.
    fn required_references(&self) -> HashMap<&str, BTreeSet<&str>> {
        let mut required: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for reference in self.steps.iter().flat_map(|s| s.suite.references()) {
            required
                .entry(reference.table.as_str())
                .or_default()
                .insert(reference.column.as_str());
        }
        required
    }

    /// Runs the checkpoint to completion.
    pub async fn run(&self, source: &dyn DataSource) -> Result<CheckpointResult> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_with_cancellation(source, cancel_rx).await
    }

    /// Runs the checkpoint, stopping between tables once `cancel` turns true.
    ///
    /// A cancelled run still produces a result covering the suites that finished,
    /// marked incomplete, and still invokes every action.
    ///
    /// # Errors
    ///
    /// Plan problems ([`GuardError::Dependency`], [`GuardError::Configuration`]) are
    /// reported before anything is fetched. A failed fetch is reported as
    /// [`GuardError::DataSource`] naming the table, an oversized reference set as
    /// [`GuardError::ReferenceSetTooLarge`]. Failing actions produce
    /// [`GuardError::ActionsFailed`], which carries the computed result.
    #[instrument(skip_all, fields(
        checkpoint.name = %self.name,
        checkpoint.tables = self.steps.len(),
        checkpoint.actions = self.actions.len(),
        source = %source.description()
    ))]
    pub async fn run_with_cancellation(
        &self,
        source: &dyn DataSource,
        cancel: watch::Receiver<bool>,
    ) -> Result<CheckpointResult> {
        self.validate_plan()?;
        info!(
            checkpoint.name = %self.name,
            checkpoint.tables = self.steps.len(),
            "Starting checkpoint"
        );

        let required = self.required_references();
        let runner = SuiteRunner::new(self.config.runner_config());
        let extractor = ReferenceExtractor::new(self.config.max_reference_set_size);
        let mut references: HashMap<ColumnRef, ReferenceSet> = HashMap::new();
        let mut suites = Vec::with_capacity(self.steps.len());
        let mut complete = true;
        let started_at = Utc::now();

        for step in &self.steps {
            let table = step.table.name();
            if *cancel.borrow() {
                warn!(
                    checkpoint.name = %self.name,
                    next.table = %table,
                    suites.completed = suites.len(),
                    "Checkpoint cancelled"
                );
                complete = false;
                break;
            }

            crate::log_data_op!(
                self.config.log,
                table = %table,
                source = %source.description(),
                "Fetching batch"
            );
            let batch = source.fetch(&step.table).await.map_err(|e| match e {
                GuardError::DataSource { .. } => e,
                other => GuardError::data_source_with_source(
                    table,
                    source.description(),
                    "fetch failed",
                    Box::new(other),
                ),
            })?;
            let batch = Arc::new(batch);
            crate::log_data_op!(
                self.config.log,
                table = %table,
                rows = batch.num_rows(),
                "Fetched batch"
            );

            let suite = step.suite.resolve(|reference| {
                references.get(reference).cloned().ok_or_else(|| {
                    GuardError::dependency(
                        table,
                        format!("reference set '{reference}' was not extracted"),
                    )
                })
            })?;

            let result = if self.config.parallel_expectations {
                runner
                    .run_parallel(Arc::new(suite), Arc::clone(&batch))
                    .await?
            } else {
                runner.run(&suite, &batch)?
            };
            suites.push(result);

            if let Some(columns) = required.get(table) {
                for column in columns {
                    let set = extractor.extract(&batch, column)?;
                    references.insert(set.source().clone(), set);
                }
            }
        }

        let result = CheckpointResult::new(&self.name, started_at, Utc::now(), complete, suites);
        info!(
            checkpoint.name = %self.name,
            checkpoint.run_id = %result.run_id(),
            checkpoint.complete = result.complete(),
            checkpoint.success = result.success(),
            expectations.total = result.statistics().evaluated_expectations,
            expectations.failed = result.statistics().failed_expectations,
            expectations.errored = result.statistics().errored_expectations,
            "Checkpoint completed"
        );

        self.run_actions(result).await
    }

    async fn run_actions(&self, result: CheckpointResult) -> Result<CheckpointResult> {
        let mut failures = Vec::new();
        for action in &self.actions {
            match action.submit(&result).await {
                Ok(()) => debug!(action = %action.name(), run_id = %result.run_id(), "Action completed"),
                Err(e) => {
                    error!(
                        action = %action.name(),
                        run_id = %result.run_id(),
                        error = %e,
                        error.type = "checkpoint_action",
                        "Checkpoint action failed"
                    );
                    failures.push(ActionFailure {
                        action: action.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(result)
        } else {
            Err(GuardError::ActionsFailed {
                failures,
                result: Box::new(result),
            })
        }
    }
}

/// Builder for [`Checkpoint`].
#[derive(Debug)]
pub struct CheckpointBuilder {
    name: String,
    steps: Vec<CheckpointStep>,
    actions: Vec<Arc<dyn ResultSink>>,
    config: CheckpointConfig,
}

impl CheckpointBuilder {
    /// Appends a table and its suite; tables run in the order they are added.
    pub fn table(mut self, table: Arc<Table>, suite: SuiteDefinition) -> Self {
        self.steps.push(CheckpointStep { table, suite });
        self
    }

    /// Appends a post-run action.
    pub fn action(mut self, action: Arc<dyn ResultSink>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn config(mut self, config: CheckpointConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the checkpoint, validating its plan.
    pub fn build(self) -> Result<Checkpoint> {
        let checkpoint = Checkpoint {
            name: self.name,
            steps: self.steps,
            actions: self.actions,
            config: self.config,
        };
        if checkpoint.name.trim().is_empty() {
            return Err(GuardError::Configuration(
                "checkpoint name cannot be empty".to_string(),
            ));
        }
        InputValidator::validate_file_name(&checkpoint.name, "checkpoint name")
            .map_err(|e| GuardError::Configuration(e.to_string()))?;
        let unique: HashSet<&str> = checkpoint.actions.iter().map(|a| a.name()).collect();
        if unique.len() != checkpoint.actions.len() {
            warn!(
                checkpoint.name = %checkpoint.name,
                "Checkpoint has several actions with the same name"
            );
        }
        checkpoint.validate_plan()?;
        Ok(checkpoint)
    }
}
