//! Evaluation of single expectations against a batch.

use super::{
    AllowedValues, Batch, ColumnData, Expectation, ExpectationResult, SemanticType, Value,
    Violation,
};
use super::value::cmp_i64_f64;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Number of violations kept per result unless configured otherwise.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Evaluates `expectation` against `batch` with the default sample size.
pub fn evaluate(expectation: &Expectation, batch: &Batch) -> ExpectationResult {
    Evaluator::default().evaluate(expectation, batch)
}

/// Executes expectations against batches.
///
/// Evaluation is pure: the batch is only read, and faults in the expectation
/// itself are reported as an `error` result rather than returned.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    sample_size: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

/// Running counts for one evaluation.
struct Tally {
    evaluated: u64,
    violations: u64,
    samples: Vec<Violation>,
    sample_size: usize,
}

impl Tally {
    fn new(sample_size: usize) -> Self {
        Self {
            evaluated: 0,
            violations: 0,
            samples: Vec::new(),
            sample_size,
        }
    }

    fn pass(&mut self) {
        self.evaluated += 1;
    }

    fn violate<F>(&mut self, row: Option<usize>, values: F)
    where
        F: FnOnce() -> Vec<Option<Value>>,
    {
        self.evaluated += 1;
        self.violations += 1;
        if self.samples.len() < self.sample_size {
            self.samples.push(Violation {
                row,
                values: values(),
            });
        }
    }
}

type Outcome = std::result::Result<Tally, String>;

impl Evaluator {
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Evaluates one expectation. Never fails: faults become `error` results.
    pub fn evaluate(&self, expectation: &Expectation, batch: &Batch) -> ExpectationResult {
        let summary = expectation.summary();
        let outcome = match expectation {
            Expectation::NotNull { column } => self.not_null(batch, column),
            Expectation::RowCountBetween { min, max } => self.row_count_between(batch, *min, *max),
            Expectation::MatchesRegex { column, pattern } => {
                self.matches_regex(batch, column, pattern)
            }
            Expectation::InSet { column, allowed } => self.in_set(batch, column, allowed),
            Expectation::Between { column, min, max } => self.between(batch, column, *min, *max),
            Expectation::ColumnGreaterThan { column_a, column_b } => {
                self.column_greater_than(batch, column_a, column_b)
            }
        };

        match outcome {
            Ok(tally) => ExpectationResult::evaluated(
                summary,
                tally.evaluated,
                tally.violations,
                tally.samples,
            ),
            Err(fault) => ExpectationResult::error(summary, fault),
        }
    }

    fn not_null(&self, batch: &Batch, column: &str) -> Outcome {
        let data = lookup(batch, column)?;
        let mut tally = Tally::new(self.sample_size);
        for row in 0..batch.num_rows() {
            if data.is_null(row) {
                tally.violate(Some(row), || vec![None]);
            } else {
                tally.pass();
            }
        }
        Ok(tally)
    }

    fn row_count_between(&self, batch: &Batch, min: Option<u64>, max: Option<u64>) -> Outcome {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(format!("inverted bounds: min {min} is greater than max {max}"));
            }
        }

        let rows = batch.num_rows() as u64;
        let mut tally = Tally::new(self.sample_size);
        let below = min.is_some_and(|min| rows < min);
        let above = max.is_some_and(|max| rows > max);
        if below || above {
            tally.violate(None, || vec![Some(Value::Integer(rows as i64))]);
        } else {
            tally.pass();
        }
        Ok(tally)
    }

    fn matches_regex(&self, batch: &Batch, column: &str, pattern: &str) -> Outcome {
        let data = lookup(batch, column)?;
        let ColumnData::Text(values) = data else {
            return Err(format!(
                "matches_regex requires a text column, '{column}' is {}",
                data.semantic_type()
            ));
        };
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;

        let mut tally = Tally::new(self.sample_size);
        for (row, value) in values.iter().enumerate() {
            let Some(value) = value else {
                continue;
            };
            if regex.is_match(value) {
                tally.pass();
            } else {
                tally.violate(Some(row), || vec![Some(Value::from(value))]);
            }
        }
        Ok(tally)
    }

    fn in_set(&self, batch: &Batch, column: &str, allowed: &AllowedValues) -> Outcome {
        let data = lookup(batch, column)?;
        let allowed = coerce_set(allowed.values(), data.semantic_type(), column)?;

        let mut tally = Tally::new(self.sample_size);
        for row in 0..batch.num_rows() {
            match data.value(row) {
                Some(value) if allowed.contains(&value) => tally.pass(),
                value => tally.violate(Some(row), || vec![value]),
            }
        }
        Ok(tally)
    }

    fn between(&self, batch: &Batch, column: &str, min: Option<f64>, max: Option<f64>) -> Outcome {
        let data = lookup(batch, column)?;
        if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
            return Err("bounds must not be NaN".to_string());
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(format!("inverted bounds: min {min} is greater than max {max}"));
            }
        }

        let within = |v: f64| min.map_or(true, |min| v >= min) && max.map_or(true, |max| v <= max);
        let mut tally = Tally::new(self.sample_size);
        match data {
            ColumnData::Integer(values) => {
                for (row, value) in values.iter().enumerate() {
                    let Some(value) = value else {
                        continue;
                    };
                    let above_min = min.map_or(true, |min| {
                        cmp_i64_f64(value, min).is_some_and(Ordering::is_ge)
                    });
                    let below_max = max.map_or(true, |max| {
                        cmp_i64_f64(value, max).is_some_and(Ordering::is_le)
                    });
                    if above_min && below_max {
                        tally.pass();
                    } else {
                        tally.violate(Some(row), || vec![Some(Value::Integer(value))]);
                    }
                }
            }
            ColumnData::Real(values) => {
                for (row, value) in values.iter().enumerate() {
                    let Some(value) = value else {
                        continue;
                    };
                    if !value.is_nan() && within(value) {
                        tally.pass();
                    } else {
                        tally.violate(Some(row), || vec![Some(Value::Real(value))]);
                    }
                }
            }
            other => {
                return Err(format!(
                    "between requires a numeric column, '{column}' is {}",
                    other.semantic_type()
                ))
            }
        }
        Ok(tally)
    }

    fn column_greater_than(&self, batch: &Batch, column_a: &str, column_b: &str) -> Outcome {
        let a = lookup(batch, column_a)?;
        let b = lookup(batch, column_b)?;
        if !a.semantic_type().is_comparable_with(b.semantic_type()) {
            return Err(format!(
                "cannot compare '{column_a}' ({}) with '{column_b}' ({})",
                a.semantic_type(),
                b.semantic_type()
            ));
        }

        let mut tally = Tally::new(self.sample_size);
        for row in 0..batch.num_rows() {
            let left = a.value(row);
            let right = b.value(row);
            let greater = match (&left, &right) {
                (Some(l), Some(r)) => l.compare(r) == Some(Ordering::Greater),
                _ => false,
            };
            if greater {
                tally.pass();
            } else {
                tally.violate(Some(row), || vec![left, right]);
            }
        }
        Ok(tally)
    }
}

fn lookup<'a>(batch: &'a Batch, column: &str) -> std::result::Result<&'a ColumnData, String> {
    batch.column(column).ok_or_else(|| {
        format!(
            "column '{column}' is not declared on table '{}'",
            batch.table().name()
        )
    })
}

fn coerce_set<'a>(
    values: &'a BTreeSet<Value>,
    target: SemanticType,
    column: &str,
) -> std::result::Result<Cow<'a, BTreeSet<Value>>, String> {
    if values.iter().all(|v| v.semantic_type() == target) {
        return Ok(Cow::Borrowed(values));
    }
    values
        .iter()
        .map(|v| {
            v.coerce_to(target).ok_or_else(|| {
                format!("allowed value {v} cannot be compared with {target} column '{column}'")
            })
        })
        .collect::<std::result::Result<BTreeSet<_>, _>>()
        .map(Cow::Owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnRef, ExpectationStatus, ReferenceSet, Table};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn batch(columns: &[(&str, SemanticType)], rows: Vec<Vec<Option<Value>>>) -> Batch {
        let mut builder = Table::builder("trades");
        for (name, semantic_type) in columns {
            builder = builder.column(*name, *semantic_type);
        }
        Batch::from_rows(Arc::new(builder.build().unwrap()), rows).unwrap()
    }

    fn single(name: &str, semantic_type: SemanticType, values: Vec<Option<Value>>) -> Batch {
        batch(
            &[(name, semantic_type)],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }

    fn text(values: &[Option<&str>]) -> Vec<Option<Value>> {
        values.iter().map(|v| v.map(Value::from)).collect()
    }

    #[test]
    fn test_not_null_counts_nulls() {
        let batch = single(
            "login_hash",
            SemanticType::Text,
            text(&[Some("A1"), None, Some("B2"), None]),
        );
        let result = evaluate(&Expectation::not_null("login_hash"), &batch);

        assert_eq!(result.status, ExpectationStatus::Failure);
        assert_eq!(result.evaluated_count, 4);
        assert_eq!(result.violation_count, 2);
        assert_eq!(result.sample_violations[0].row, Some(1));
        assert_eq!(result.sample_violations[0].values, vec![None]);
    }

    #[test]
    fn test_not_null_on_empty_batch_succeeds() {
        let batch = single("login_hash", SemanticType::Text, vec![]);
        let result = evaluate(&Expectation::not_null("login_hash"), &batch);
        assert!(result.is_success());
        assert_eq!(result.evaluated_count, 0);
    }

    #[test]
    fn test_row_count_between() {
        let empty = single("login_hash", SemanticType::Text, vec![]);
        let result = evaluate(&Expectation::row_count_between(Some(1), None), &empty);
        assert_eq!(result.status, ExpectationStatus::Failure);
        assert_eq!(result.evaluated_count, 1);
        assert_eq!(result.sample_violations[0].row, None);
        assert_eq!(
            result.sample_violations[0].values,
            vec![Some(Value::Integer(0))]
        );

        let three = single("login_hash", SemanticType::Text, text(&[None, None, None]));
        assert!(evaluate(&Expectation::row_count_between(Some(1), Some(3)), &three).is_success());
        assert!(!evaluate(&Expectation::row_count_between(None, Some(2)), &three).is_success());
    }

    #[test]
    fn test_row_count_inverted_bounds_is_error() {
        let batch = single("login_hash", SemanticType::Text, vec![]);
        let result = evaluate(&Expectation::row_count_between(Some(5), Some(1)), &batch);
        assert_eq!(result.status, ExpectationStatus::Error);
    }

    #[test]
    fn test_matches_regex_is_anchored_and_skips_nulls() {
        let batch = single(
            "symbol",
            SemanticType::Text,
            text(&[Some("USDCHF"), Some("USD,CHF"), None, Some("EUR USD")]),
        );
        let result = evaluate(
            &Expectation::matches_regex("symbol", "[A-Za-z0-9]+"),
            &batch,
        );

        assert_eq!(result.evaluated_count, 3);
        assert_eq!(result.violation_count, 2);
        assert_eq!(
            result.sample_violations[0].values,
            vec![Some(Value::from("USD,CHF"))]
        );
    }

    #[test]
    fn test_matches_regex_alternation_is_anchored() {
        let batch = single("code", SemanticType::Text, text(&[Some("abx")]));
        let result = evaluate(&Expectation::matches_regex("code", "a|ab"), &batch);
        assert_eq!(result.violation_count, 1);
    }

    #[test]
    fn test_matches_regex_faults() {
        let batch = single("digits", SemanticType::Integer, vec![Some(Value::Integer(1))]);
        let result = evaluate(&Expectation::matches_regex("digits", "[0-9]+"), &batch);
        assert_eq!(result.status, ExpectationStatus::Error);

        let batch = single("symbol", SemanticType::Text, text(&[Some("X")]));
        let result = evaluate(&Expectation::matches_regex("symbol", "(unclosed"), &batch);
        assert_eq!(result.status, ExpectationStatus::Error);
        assert!(result.message.unwrap().contains("invalid pattern"));
    }

    #[test]
    fn test_in_set_is_case_sensitive_and_null_strict() {
        let batch = single(
            "currency",
            SemanticType::Text,
            text(&[Some("USD"), Some("usd"), None, Some("EUR")]),
        );
        let result = evaluate(
            &Expectation::in_set("currency", ["AUD", "EUR", "NZD", "USD"]),
            &batch,
        );

        assert_eq!(result.evaluated_count, 4);
        assert_eq!(result.violation_count, 2);
        assert_eq!(result.sample_violations[0].row, Some(1));
        assert_eq!(result.sample_violations[1].values, vec![None]);
    }

    #[test]
    fn test_in_set_coerces_literals() {
        let batch = single(
            "volume",
            SemanticType::Real,
            vec![Some(Value::Real(1.0)), Some(Value::Real(2.5))],
        );
        let result = evaluate(&Expectation::in_set("volume", [1i64, 2]), &batch);
        assert_eq!(result.status, ExpectationStatus::Failure);
        assert_eq!(result.violation_count, 1);
    }

    #[test]
    fn test_in_set_matches_negative_zero() {
        let batch = single(
            "cmd",
            SemanticType::Real,
            vec![Some(Value::Real(-0.0)), Some(Value::Real(1.0))],
        );
        let result = evaluate(&Expectation::in_set("cmd", [0i64, 1]), &batch);
        assert_eq!(result.status, ExpectationStatus::Success);
        assert_eq!(result.violation_count, 0);
    }

    #[test]
    fn test_in_set_uncoercible_literal_is_error() {
        let batch = single("enable", SemanticType::Integer, vec![Some(Value::Integer(1))]);
        let result = evaluate(&Expectation::in_set("enable", ["yes"]), &batch);
        assert_eq!(result.status, ExpectationStatus::Error);
    }

    #[test]
    fn test_in_reference_set_counts_duplicates() {
        let reference = ReferenceSet::new(
            ColumnRef::new("users", "server_hash"),
            SemanticType::Text,
            [Value::from("S1")].into_iter().collect(),
        );
        let batch = single(
            "server_hash",
            SemanticType::Text,
            text(&[Some("S1"), Some("S9"), Some("S9")]),
        );
        let result = evaluate(
            &Expectation::in_reference_set("server_hash", reference),
            &batch,
        );
        assert_eq!(result.violation_count, 2);
    }

    #[test]
    fn test_between_bounds_are_inclusive() {
        let batch = single(
            "digits",
            SemanticType::Integer,
            vec![
                Some(Value::Integer(-1)),
                Some(Value::Integer(0)),
                Some(Value::Integer(10)),
                Some(Value::Integer(11)),
                None,
            ],
        );
        let result = evaluate(
            &Expectation::between("digits", Some(0.0), Some(10.0)),
            &batch,
        );

        assert_eq!(result.evaluated_count, 4);
        assert_eq!(result.violation_count, 2);
        let rows: Vec<_> = result.sample_violations.iter().map(|v| v.row).collect();
        assert_eq!(rows, vec![Some(0), Some(3)]);
    }

    #[test]
    fn test_between_nan_is_violation() {
        let batch = single(
            "volume",
            SemanticType::Real,
            vec![Some(Value::Real(f64::NAN)), Some(Value::Real(1.5))],
        );
        let result = evaluate(&Expectation::between("volume", Some(0.0), None), &batch);
        assert_eq!(result.violation_count, 1);
        assert_eq!(result.sample_violations[0].row, Some(0));
    }

    #[test]
    fn test_between_nan_is_violation_without_bounds() {
        let batch = single(
            "volume",
            SemanticType::Real,
            vec![Some(Value::Real(f64::NAN)), Some(Value::Real(1.5))],
        );
        let result = evaluate(&Expectation::between("volume", None, None), &batch);
        assert_eq!(result.evaluated_count, 2);
        assert_eq!(result.violation_count, 1);
        assert_eq!(result.sample_violations[0].row, Some(0));
    }

    #[test]
    fn test_between_large_integers_are_exact() {
        let limit = 9_007_199_254_740_992_i64; // 2^53
        let batch = single(
            "ticket",
            SemanticType::Integer,
            vec![
                Some(Value::Integer(limit)),
                Some(Value::Integer(limit + 1)),
                Some(Value::Integer(-limit - 1)),
            ],
        );
        let result = evaluate(
            &Expectation::between("ticket", Some(-(limit as f64)), Some(limit as f64)),
            &batch,
        );
        assert_eq!(result.violation_count, 2);
        let rows: Vec<_> = result.sample_violations.iter().map(|v| v.row).collect();
        assert_eq!(rows, vec![Some(1), Some(2)]);

        let result = evaluate(&Expectation::between("ticket", Some(0.5), None), &batch);
        assert_eq!(result.violation_count, 1);
    }

    #[test]
    fn test_between_faults() {
        let batch = single("symbol", SemanticType::Text, text(&[Some("X")]));
        assert_eq!(
            evaluate(&Expectation::between("symbol", Some(0.0), None), &batch).status,
            ExpectationStatus::Error
        );

        let batch = single("volume", SemanticType::Real, vec![Some(Value::Real(1.0))]);
        assert_eq!(
            evaluate(&Expectation::between("volume", Some(2.0), Some(1.0)), &batch).status,
            ExpectationStatus::Error
        );
    }

    #[test]
    fn test_column_greater_than_timestamps() {
        let t1 = Value::from(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let t2 = Value::from(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        let batch = batch(
            &[
                ("open_time", SemanticType::Timestamp),
                ("close_time", SemanticType::Timestamp),
            ],
            vec![
                vec![Some(t1.clone()), Some(t2.clone())],
                vec![Some(t2.clone()), Some(t1.clone())],
                vec![Some(t1.clone()), Some(t1.clone())],
                vec![Some(t1.clone()), None],
            ],
        );
        let result = evaluate(
            &Expectation::column_greater_than("close_time", "open_time"),
            &batch,
        );

        assert_eq!(result.evaluated_count, 4);
        assert_eq!(result.violation_count, 3);
        assert_eq!(result.sample_violations[0].row, Some(1));
        assert_eq!(
            result.sample_violations[0].values,
            vec![Some(t1.clone()), Some(t2)]
        );
        assert_eq!(result.sample_violations[2].values, vec![None, Some(t1)]);
    }

    #[test]
    fn test_column_greater_than_mixed_numeric() {
        let batch = batch(
            &[("a", SemanticType::Integer), ("b", SemanticType::Real)],
            vec![
                vec![Some(Value::Integer(2)), Some(Value::Real(1.5))],
                vec![Some(Value::Integer(1)), Some(Value::Real(1.5))],
            ],
        );
        let result = evaluate(&Expectation::column_greater_than("a", "b"), &batch);
        assert_eq!(result.violation_count, 1);
    }

    #[test]
    fn test_column_greater_than_incomparable_is_error() {
        let batch = batch(
            &[("a", SemanticType::Text), ("b", SemanticType::Integer)],
            vec![],
        );
        let result = evaluate(&Expectation::column_greater_than("a", "b"), &batch);
        assert_eq!(result.status, ExpectationStatus::Error);
    }

    #[test]
    fn test_unknown_column_is_error() {
        let batch = single("symbol", SemanticType::Text, vec![]);
        let result = evaluate(&Expectation::not_null("ticket_hash"), &batch);
        assert_eq!(result.status, ExpectationStatus::Error);
        assert!(result.message.unwrap().contains("ticket_hash"));
    }

    #[test]
    fn test_sample_is_bounded() {
        let batch = single("login_hash", SemanticType::Text, vec![None; 50]);
        let result = Evaluator::new(5).evaluate(&Expectation::not_null("login_hash"), &batch);
        assert_eq!(result.violation_count, 50);
        assert_eq!(result.sample_violations.len(), 5);
        assert_eq!(result.sample_violations[4].row, Some(4));
    }
}
