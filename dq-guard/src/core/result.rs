//! Expectation, suite and checkpoint result types.

use super::{ExpectationSummary, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The outcome status of a single expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectationStatus {
    /// No violations were found
    Success,
    /// At least one row violated the expectation
    Failure,
    /// The expectation could not be evaluated (bad parameters, unknown column)
    Error,
}

impl ExpectationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExpectationStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExpectationStatus::Failure)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExpectationStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectationStatus::Success => "success",
            ExpectationStatus::Failure => "failure",
            ExpectationStatus::Error => "error",
        }
    }
}

/// One row (or the whole batch) failing an expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Row position in the batch; absent for whole-batch rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Offending values in the order of the expectation's columns, nulls kept
    pub values: Vec<Option<Value>>,
}

/// The result of evaluating one expectation against one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationResult {
    /// What was evaluated
    pub expectation: ExpectationSummary,
    pub status: ExpectationStatus,
    /// Number of rows (or pseudo-rows) the rule looked at
    pub evaluated_count: u64,
    /// Number of violations, never more than `evaluated_count`
    pub violation_count: u64,
    /// The first violations found, bounded by the configured sample size
    pub sample_violations: Vec<Violation>,
    /// Failure summary or fault description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExpectationResult {
    /// Builds a success or failure result from evaluation counts.
    pub fn evaluated(
        expectation: ExpectationSummary,
        evaluated_count: u64,
        violation_count: u64,
        sample_violations: Vec<Violation>,
    ) -> Self {
        let (status, message) = if violation_count == 0 {
            (ExpectationStatus::Success, None)
        } else {
            (
                ExpectationStatus::Failure,
                Some(format!(
                    "{violation_count} of {evaluated_count} evaluated rows violate {expectation}"
                )),
            )
        };
        Self {
            expectation,
            status,
            evaluated_count,
            violation_count,
            sample_violations,
            message,
        }
    }

    /// Builds an error result for an expectation that could not be evaluated.
    pub fn error(expectation: ExpectationSummary, message: impl Into<String>) -> Self {
        Self {
            expectation,
            status: ExpectationStatus::Error,
            evaluated_count: 0,
            violation_count: 0,
            sample_violations: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The outcome of running one suite against one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    suite_name: String,
    table_name: String,
    row_count: u64,
    results: Vec<ExpectationResult>,
    success: bool,
}

impl SuiteResult {
    pub fn new(
        suite_name: impl Into<String>,
        table_name: impl Into<String>,
        row_count: u64,
        results: Vec<ExpectationResult>,
    ) -> Self {
        let success = results.iter().all(ExpectationResult::is_success);
        Self {
            suite_name: suite_name.into(),
            table_name: table_name.into(),
            row_count,
            results,
            success,
        }
    }

    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Results in the suite's declaration order.
    pub fn results(&self) -> &[ExpectationResult] {
        &self.results
    }

    pub fn success(&self) -> bool {
        self.success
    }

    fn count(&self, status: ExpectationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn successful_count(&self) -> usize {
        self.count(ExpectationStatus::Success)
    }

    pub fn failed_count(&self) -> usize {
        self.count(ExpectationStatus::Failure)
    }

    pub fn errored_count(&self) -> usize {
        self.count(ExpectationStatus::Error)
    }
}

/// Aggregate counts across every suite of a checkpoint run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointStatistics {
    /// Total number of expectations evaluated
    pub evaluated_expectations: usize,
    /// Number of expectations that passed
    pub successful_expectations: usize,
    /// Number of expectations with violations
    pub failed_expectations: usize,
    /// Number of expectations that could not be evaluated
    pub errored_expectations: usize,
    /// Share of successful expectations (0.0 to 100.0)
    pub success_percent: f64,
}

impl CheckpointStatistics {
    fn from_suites(suites: &[SuiteResult]) -> Self {
        let mut stats = Self {
            evaluated_expectations: 0,
            successful_expectations: 0,
            failed_expectations: 0,
            errored_expectations: 0,
            success_percent: 100.0,
        };
        for suite in suites {
            stats.evaluated_expectations += suite.results().len();
            stats.successful_expectations += suite.successful_count();
            stats.failed_expectations += suite.failed_count();
            stats.errored_expectations += suite.errored_count();
        }
        if stats.evaluated_expectations > 0 {
            stats.success_percent = stats.successful_expectations as f64
                / stats.evaluated_expectations as f64
                * 100.0;
        }
        stats
    }
}

/// The report of one checkpoint run.
///
/// `success` holds only when the run completed and every suite succeeded; a
/// cancelled run is never successful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    name: String,
    run_id: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    complete: bool,
    success: bool,
    statistics: CheckpointStatistics,
    suites: Vec<SuiteResult>,
}

impl CheckpointResult {
    pub fn new(
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        complete: bool,
        suites: Vec<SuiteResult>,
    ) -> Self {
        let name = name.into();
        let run_id = format!("{name}-{}", started_at.format("%Y%m%dT%H%M%S%.6fZ"));
        let success = complete && suites.iter().all(SuiteResult::success);
        let statistics = CheckpointStatistics::from_suites(&suites);
        Self {
            name,
            run_id,
            started_at,
            finished_at,
            complete,
            success,
            statistics,
            suites,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique per run: the checkpoint name plus the start timestamp.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// False when the run was cancelled before every table was validated.
    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn statistics(&self) -> &CheckpointStatistics {
        &self.statistics
    }

    /// Suite results in checkpoint order.
    pub fn suites(&self) -> &[SuiteResult] {
        &self.suites
    }

    pub fn suite(&self, table: &str) -> Option<&SuiteResult> {
        self.suites.iter().find(|s| s.table_name() == table)
    }

    /// SHA-256 over the run-independent content of the result.
    ///
    /// Timestamps and the run id are left out, so two runs over unchanged data
    /// have the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([self.complete as u8]);
        // Serializing plain data structures with string keys does not fail.
        if let Ok(content) = serde_json::to_vec(&self.suites) {
            hasher.update(&content);
        }
        hex::encode(hasher.finalize())
    }
}
