//! Immutable row snapshots of a declared table.

use super::{micros_to_datetime, SemanticType, Table, Value};
use crate::prelude::*;
use arrow::array::{
    new_empty_array, Array, ArrayRef, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::compute::{cast_with_options, concat, CastOptions};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::debug;

/// One column of a batch, normalised to the Arrow type of its semantic type.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Text(StringArray),
    Integer(Int64Array),
    Real(Float64Array),
    Timestamp(TimestampMicrosecondArray),
}

impl ColumnData {
    fn from_array(column: &str, semantic_type: SemanticType, array: &ArrayRef) -> Result<Self> {
        let mismatch = || GuardError::TypeMismatch {
            column: column.to_string(),
            expected: semantic_type.arrow_type().to_string(),
            found: array.data_type().to_string(),
        };
        let any = array.as_any();
        match semantic_type {
            SemanticType::Text => any
                .downcast_ref::<StringArray>()
                .cloned()
                .map(ColumnData::Text),
            SemanticType::Integer => any
                .downcast_ref::<Int64Array>()
                .cloned()
                .map(ColumnData::Integer),
            SemanticType::Real => any
                .downcast_ref::<Float64Array>()
                .cloned()
                .map(ColumnData::Real),
            SemanticType::Timestamp => any
                .downcast_ref::<TimestampMicrosecondArray>()
                .cloned()
                .map(ColumnData::Timestamp),
        }
        .ok_or_else(mismatch)
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            ColumnData::Text(_) => SemanticType::Text,
            ColumnData::Integer(_) => SemanticType::Integer,
            ColumnData::Real(_) => SemanticType::Real,
            ColumnData::Timestamp(_) => SemanticType::Timestamp,
        }
    }

    fn array(&self) -> &dyn Array {
        match self {
            ColumnData::Text(a) => a,
            ColumnData::Integer(a) => a,
            ColumnData::Real(a) => a,
            ColumnData::Timestamp(a) => a,
        }
    }

    pub fn len(&self) -> usize {
        self.array().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.array().is_null(row)
    }

    pub fn null_count(&self) -> usize {
        self.array().null_count()
    }

    /// The value at `row`, or `None` for null. `row` must be in bounds.
    pub fn value(&self, row: usize) -> Option<Value> {
        if self.is_null(row) {
            return None;
        }
        Some(match self {
            ColumnData::Text(a) => Value::Text(a.value(row).to_string()),
            ColumnData::Integer(a) => Value::Integer(a.value(row)),
            ColumnData::Real(a) => Value::Real(a.value(row)),
            ColumnData::Timestamp(a) => Value::Timestamp(micros_to_datetime(a.value(row))),
        })
    }
}

/// A rectangular, read-only snapshot of a table's rows.
///
/// Every declared column is present and typed according to its [`SemanticType`].
/// Batches are never mutated after construction; share them as `Arc<Batch>`.
#[derive(Debug, Clone)]
pub struct Batch {
    table: Arc<Table>,
    columns: Vec<ColumnData>,
    num_rows: usize,
}

impl Batch {
    /// Builds a batch from Arrow record batches.
    ///
    /// Only declared columns are kept. Each is cast to its semantic type's Arrow
    /// type; casting is strict, so a value that cannot be represented fails with
    /// [`GuardError::TypeMismatch`] instead of turning into a null.
    pub fn try_new(table: Arc<Table>, batches: &[RecordBatch]) -> Result<Self> {
        let options = CastOptions {
            safe: false,
            ..Default::default()
        };

        let mut columns = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            let target = column.semantic_type.arrow_type();
            let mut pieces: Vec<ArrayRef> = Vec::with_capacity(batches.len());

            for batch in batches {
                let index = batch.schema().index_of(&column.name).map_err(|_| {
                    GuardError::ColumnNotFound {
                        table: table.name().to_string(),
                        column: column.name.clone(),
                    }
                })?;
                let source = batch.column(index);
                let piece = if source.data_type() == &target {
                    Arc::clone(source)
                } else {
                    cast_with_options(source, &target, &options).map_err(|e| {
                        GuardError::TypeMismatch {
                            column: column.name.clone(),
                            expected: target.to_string(),
                            found: format!("{} ({e})", source.data_type()),
                        }
                    })?
                };
                pieces.push(piece);
            }

            let array = match pieces.len() {
                0 => new_empty_array(&target),
                1 => pieces.remove(0),
                _ => {
                    let refs: Vec<&dyn Array> = pieces.iter().map(|a| a.as_ref()).collect();
                    concat(&refs)?
                }
            };
            columns.push(ColumnData::from_array(
                &column.name,
                column.semantic_type,
                &array,
            )?);
        }

        let num_rows = batches.iter().map(|b| b.num_rows()).sum();
        debug!(
            table = %table.name(),
            rows = num_rows,
            record_batches = batches.len(),
            "Built batch from record batches"
        );
        Ok(Self {
            table,
            columns,
            num_rows,
        })
    }

    /// Builds a batch from rows of optional values, one entry per declared column.
    ///
    /// Values are coerced to the column type (see [`Value::coerce_to`]).
    pub fn from_rows(table: Arc<Table>, rows: Vec<Vec<Option<Value>>>) -> Result<Self> {
        let width = table.columns().len();
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(GuardError::Configuration(format!(
                "row {index} of '{}' has {} values, expected {width}",
                table.name(),
                row.len()
            )));
        }

        let mut columns = Vec::with_capacity(width);
        for (index, column) in table.columns().iter().enumerate() {
            let mut cells = Vec::with_capacity(rows.len());
            for row in &rows {
                let cell = match &row[index] {
                    None => None,
                    Some(value) => Some(value.coerce_to(column.semantic_type).ok_or_else(
                        || GuardError::TypeMismatch {
                            column: column.name.clone(),
                            expected: column.semantic_type.to_string(),
                            found: format!("{} {value}", value.semantic_type()),
                        },
                    )?),
                };
                cells.push(cell);
            }

            let data = match column.semantic_type {
                SemanticType::Text => ColumnData::Text(StringArray::from(
                    cells
                        .into_iter()
                        .map(|c| match c {
                            Some(Value::Text(s)) => Some(s),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
                SemanticType::Integer => ColumnData::Integer(Int64Array::from(
                    cells
                        .into_iter()
                        .map(|c| match c {
                            Some(Value::Integer(i)) => Some(i),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
                SemanticType::Real => ColumnData::Real(Float64Array::from(
                    cells
                        .into_iter()
                        .map(|c| match c {
                            Some(Value::Real(r)) => Some(r),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
                SemanticType::Timestamp => ColumnData::Timestamp(TimestampMicrosecondArray::from(
                    cells
                        .into_iter()
                        .map(|c| match c {
                            Some(Value::Timestamp(ts)) => Some(ts.timestamp_micros()),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
            };
            columns.push(data);
        }

        Ok(Self {
            table,
            columns,
            num_rows: rows.len(),
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Looks up a declared column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.table.column_index(name).map(|i| &self.columns[i])
    }
}
