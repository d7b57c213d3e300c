//! Table declarations.

use super::SemanticType;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A declared column: name plus semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
}

/// A relational table as the engine sees it: a name and ordered, typed columns.
///
/// Tables are immutable once built and are usually shared as `Arc<Table>`.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{SemanticType, Table};
///
/// let users = Table::builder("users")
///     .column("login_hash", SemanticType::Text)
///     .column("enable", SemanticType::Integer)
///     .build()
///     .unwrap();
///
/// assert_eq!(users.column_index("enable"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: Vec<ColumnDef>,
}

impl Table {
    /// Creates a table, rejecting empty names and duplicate columns.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self> {
        let table = Self {
            name: name.into(),
            columns,
        };
        table.validate()?;
        Ok(table)
    }

    /// Starts a table declaration.
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Parses a table declaration from JSON.
    ///
    /// ```rust
    /// use dq_guard::core::Table;
    ///
    /// let table = Table::from_json(
    ///     r#"{"name": "users", "columns": [{"name": "currency", "type": "text"}]}"#,
    /// ).unwrap();
    /// assert_eq!(table.name(), "users");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Table = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GuardError::Configuration(
                "table name cannot be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(GuardError::Configuration(format!(
                    "column '{}' declared twice on table '{}'",
                    column.name, self.name
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Position of a declared column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Declared semantic type of a column.
    pub fn column_type(&self, name: &str) -> Option<SemanticType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.semantic_type)
    }
}

/// Builder for [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDef>,
}

impl TableBuilder {
    /// Appends a column.
    pub fn column(mut self, name: impl Into<String>, semantic_type: SemanticType) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            semantic_type,
        });
        self
    }

    pub fn build(self) -> Result<Table> {
        Table::new(self.name, self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_builder() {
        let table = Table::builder("trades")
            .column("symbol", SemanticType::Text)
            .column("digits", SemanticType::Integer)
            .build()
            .unwrap();

        assert_eq!(table.name(), "trades");
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.column_type("digits"), Some(SemanticType::Integer));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Table::builder("trades")
            .column("symbol", SemanticType::Text)
            .column("symbol", SemanticType::Text)
            .build();
        assert!(matches!(result, Err(GuardError::Configuration(_))));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Table::builder(" ").build().is_err());
    }

    #[test]
    fn test_from_json() {
        let table = Table::from_json(
            r#"{
                "name": "trades",
                "columns": [
                    {"name": "open_time", "type": "timestamp"},
                    {"name": "volume", "type": "real"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(table.column_type("open_time"), Some(SemanticType::Timestamp));
        assert_eq!(table.column_type("volume"), Some(SemanticType::Real));
    }
}
