//! Reference sets extracted from validated batches.

use super::{Batch, ColumnRef, SemanticType, Value};
use crate::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// The distinct non-null values of one column of one validated batch.
///
/// Frozen at extraction and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    source: ColumnRef,
    semantic_type: SemanticType,
    values: Arc<BTreeSet<Value>>,
}

impl ReferenceSet {
    pub fn new(source: ColumnRef, semantic_type: SemanticType, values: BTreeSet<Value>) -> Self {
        Self {
            source,
            semantic_type,
            values: Arc::new(values),
        }
    }

    /// The `table.column` the values were taken from.
    pub fn source(&self) -> &ColumnRef {
        &self.source
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn values(&self) -> &BTreeSet<Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }
}

/// Derives [`ReferenceSet`]s from batches.
///
/// Extraction never truncates. When a column holds more distinct values than
/// `max_size`, it fails with [`GuardError::ReferenceSetTooLarge`]: a partial set
/// would report valid foreign values as violations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceExtractor {
    max_size: Option<usize>,
}

impl ReferenceExtractor {
    pub fn new(max_size: Option<usize>) -> Self {
        Self { max_size }
    }

    pub fn unlimited() -> Self {
        Self { max_size: None }
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Collects the distinct non-null values of `column` across the whole batch.
    pub fn extract(&self, batch: &Batch, column: &str) -> Result<ReferenceSet> {
        let source = ColumnRef::new(batch.table().name(), column);
        let data = batch.column(column).ok_or_else(|| GuardError::ColumnNotFound {
            table: source.table.clone(),
            column: source.column.clone(),
        })?;

        let mut values = BTreeSet::new();
        for row in 0..data.len() {
            let Some(value) = data.value(row) else {
                continue;
            };
            values.insert(value);
            if let Some(limit) = self.max_size {
                if values.len() > limit {
                    return Err(GuardError::ReferenceSetTooLarge {
                        reference: source.to_string(),
                        limit,
                    });
                }
            }
        }

        debug!(
            reference = %source,
            distinct_values = values.len(),
            rows = batch.num_rows(),
            "Extracted reference set"
        );
        Ok(ReferenceSet::new(source, data.semantic_type(), values))
    }
}
