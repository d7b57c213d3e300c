//! Expectation model and its declarative definition surface.

use super::{ReferenceSet, Value};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A qualified `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// The rule family an expectation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationKind {
    NotNull,
    RowCountBetween,
    MatchesRegex,
    InSet,
    Between,
    ColumnGreaterThan,
}

impl ExpectationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectationKind::NotNull => "not_null",
            ExpectationKind::RowCountBetween => "row_count_between",
            ExpectationKind::MatchesRegex => "matches_regex",
            ExpectationKind::InSet => "in_set",
            ExpectationKind::Between => "between",
            ExpectationKind::ColumnGreaterThan => "column_greater_than",
        }
    }
}

impl fmt::Display for ExpectationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The allowed values of an [`Expectation::InSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum AllowedValues {
    /// Values written into the suite.
    Literal(Arc<BTreeSet<Value>>),
    /// Distinct values extracted from an earlier table.
    Reference(ReferenceSet),
}

impl AllowedValues {
    pub fn values(&self) -> &BTreeSet<Value> {
        match self {
            AllowedValues::Literal(values) => values,
            AllowedValues::Reference(set) => set.values(),
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// A single declarative rule over one table.
///
/// Expectations are immutable once built. Malformed parameters (an invalid regex,
/// inverted bounds, a column of the wrong type) are not rejected here; they are
/// reported as an `error` status when the expectation is evaluated.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Expectation, ExpectationKind};
///
/// let expectation = Expectation::between("digits", Some(0.0), Some(10.0));
/// assert_eq!(expectation.kind(), ExpectationKind::Between);
/// assert_eq!(expectation.columns(), vec!["digits"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    NotNull {
        column: String,
    },
    RowCountBetween {
        min: Option<u64>,
        max: Option<u64>,
    },
    MatchesRegex {
        column: String,
        pattern: String,
    },
    InSet {
        column: String,
        allowed: AllowedValues,
    },
    Between {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    ColumnGreaterThan {
        column_a: String,
        column_b: String,
    },
}

impl Expectation {
    pub fn not_null(column: impl Into<String>) -> Self {
        Expectation::NotNull {
            column: column.into(),
        }
    }

    pub fn row_count_between(min: Option<u64>, max: Option<u64>) -> Self {
        Expectation::RowCountBetween { min, max }
    }

    /// Every non-null value must match `pattern` in full.
    pub fn matches_regex(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Expectation::MatchesRegex {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn in_set<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expectation::InSet {
            column: column.into(),
            allowed: AllowedValues::Literal(Arc::new(
                values.into_iter().map(Into::into).collect(),
            )),
        }
    }

    pub fn in_reference_set(column: impl Into<String>, reference: ReferenceSet) -> Self {
        Expectation::InSet {
            column: column.into(),
            allowed: AllowedValues::Reference(reference),
        }
    }

    /// Inclusive numeric bounds; `None` leaves that side open.
    pub fn between(column: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Expectation::Between {
            column: column.into(),
            min,
            max,
        }
    }

    /// Every row must satisfy `column_a > column_b`.
    pub fn column_greater_than(column_a: impl Into<String>, column_b: impl Into<String>) -> Self {
        Expectation::ColumnGreaterThan {
            column_a: column_a.into(),
            column_b: column_b.into(),
        }
    }

    pub fn kind(&self) -> ExpectationKind {
        match self {
            Expectation::NotNull { .. } => ExpectationKind::NotNull,
            Expectation::RowCountBetween { .. } => ExpectationKind::RowCountBetween,
            Expectation::MatchesRegex { .. } => ExpectationKind::MatchesRegex,
            Expectation::InSet { .. } => ExpectationKind::InSet,
            Expectation::Between { .. } => ExpectationKind::Between,
            Expectation::ColumnGreaterThan { .. } => ExpectationKind::ColumnGreaterThan,
        }
    }

    /// Columns the expectation reads, in parameter order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Expectation::RowCountBetween { .. } => Vec::new(),
            Expectation::NotNull { column }
            | Expectation::MatchesRegex { column, .. }
            | Expectation::InSet { column, .. }
            | Expectation::Between { column, .. } => vec![column.as_str()],
            Expectation::ColumnGreaterThan { column_a, column_b } => {
                vec![column_a.as_str(), column_b.as_str()]
            }
        }
    }

    /// Report-friendly description of the expectation.
    ///
    /// Reference sets are described by source and size only.
    pub fn summary(&self) -> ExpectationSummary {
        let mut parameters = BTreeMap::new();
        match self {
            Expectation::NotNull { .. } | Expectation::ColumnGreaterThan { .. } => {}
            Expectation::RowCountBetween { min, max } => {
                parameters.insert("min_value".to_string(), serde_json::json!(min));
                parameters.insert("max_value".to_string(), serde_json::json!(max));
            }
            Expectation::MatchesRegex { pattern, .. } => {
                parameters.insert("regex".to_string(), serde_json::json!(pattern));
            }
            Expectation::InSet { allowed, .. } => match allowed {
                AllowedValues::Literal(values) => {
                    parameters.insert(
                        "value_set".to_string(),
                        serde_json::json!(values.iter().collect::<Vec<_>>()),
                    );
                }
                AllowedValues::Reference(set) => {
                    parameters.insert(
                        "reference".to_string(),
                        serde_json::json!(set.source().to_string()),
                    );
                    parameters.insert("reference_size".to_string(), serde_json::json!(set.len()));
                }
            },
            Expectation::Between { min, max, .. } => {
                parameters.insert("min_value".to_string(), serde_json::json!(min));
                parameters.insert("max_value".to_string(), serde_json::json!(max));
            }
        }

        ExpectationSummary {
            kind: self.kind(),
            columns: self.columns().into_iter().map(String::from).collect(),
            parameters,
        }
    }
}

/// What a result reports about the expectation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSummary {
    pub kind: ExpectationKind,
    pub columns: Vec<String>,
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl fmt::Display for ExpectationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.columns.join(", "))
    }
}

/// Declarative form of an [`Expectation`].
///
/// Identical to the resolved model except that a set membership rule may name
/// another table's column instead of listing values. Deserialises from JSON with a
/// snake_case `kind` tag:
///
/// ```rust
/// use dq_guard::core::ExpectationDefinition;
///
/// let definition: ExpectationDefinition = serde_json::from_str(
///     r#"{"kind": "in_reference_set", "column": "server_hash",
///         "reference": {"table": "users", "column": "server_hash"}}"#,
/// ).unwrap();
/// assert!(definition.reference().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectationDefinition {
    NotNull {
        column: String,
    },
    RowCountBetween {
        #[serde(default)]
        min: Option<u64>,
        #[serde(default)]
        max: Option<u64>,
    },
    MatchesRegex {
        column: String,
        pattern: String,
    },
    InSet {
        column: String,
        values: Vec<Value>,
    },
    InReferenceSet {
        column: String,
        reference: ColumnRef,
    },
    Between {
        column: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    ColumnGreaterThan {
        column_a: String,
        column_b: String,
    },
}

impl ExpectationDefinition {
    /// The other table's column this definition depends on, if any.
    pub fn reference(&self) -> Option<&ColumnRef> {
        match self {
            ExpectationDefinition::InReferenceSet { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// Turns the definition into an [`Expectation`], asking `resolver` for any
    /// reference set it depends on.
    pub fn resolve<F>(&self, resolver: &mut F) -> Result<Expectation>
    where
        F: FnMut(&ColumnRef) -> Result<ReferenceSet>,
    {
        Ok(match self {
            ExpectationDefinition::NotNull { column } => Expectation::not_null(column.as_str()),
            ExpectationDefinition::RowCountBetween { min, max } => {
                Expectation::row_count_between(*min, *max)
            }
            ExpectationDefinition::MatchesRegex { column, pattern } => {
                Expectation::matches_regex(column.as_str(), pattern.as_str())
            }
            ExpectationDefinition::InSet { column, values } => {
                Expectation::in_set(column.as_str(), values.iter().cloned())
            }
            ExpectationDefinition::InReferenceSet { column, reference } => {
                Expectation::in_reference_set(column.as_str(), resolver(reference)?)
            }
            ExpectationDefinition::Between { column, min, max } => {
                Expectation::between(column.as_str(), *min, *max)
            }
            ExpectationDefinition::ColumnGreaterThan { column_a, column_b } => {
                Expectation::column_greater_than(column_a.as_str(), column_b.as_str())
            }
        })
    }
}
