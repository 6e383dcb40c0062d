//! Table snapshots.
//!
//! A [`Table`] is a full, self-contained copy of one named table: ordered
//! column names plus ordered rows. Changesets stage whole snapshots and the
//! approval pipeline reviews them row by row, so row order is significant
//! and preserved by every operation here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors raised while building or indexing a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Row {row} has {found} values but the table has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Row {row} out of range (table has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },

    #[error("Table has no header row")]
    MissingHeader,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; text cells holding an integer literal are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// A full table snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_unique(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a table from a header list followed by row lists.
    ///
    /// Every cell becomes [`Value::Text`].
    pub fn from_lists(lists: Vec<Vec<String>>) -> Result<Self, TableError> {
        let mut lists = lists.into_iter();
        let header = lists.next().ok_or(TableError::MissingHeader)?;
        let mut table = Table::new(header)?;
        for row in lists {
            table.push_row(row.into_iter().map(Value::Text).collect())?;
        }
        Ok(table)
    }

    /// Builder-style row append.
    pub fn with_row<I, V>(mut self, row: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_row(row.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Result<&Value, TableError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        self.rows
            .get(row)
            .map(|r| &r[col])
            .ok_or(TableError::RowOutOfRange {
                row,
                len: self.rows.len(),
            })
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>, TableError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        Ok(self.rows.iter().map(|r| &r[col]).collect())
    }

    /// Copy of this table keeping only `indices`, in the order given.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Table, TableError> {
        let mut rows = Vec::with_capacity(indices.len());
        for &index in indices {
            let row = self.rows.get(index).ok_or(TableError::RowOutOfRange {
                row: index,
                len: self.rows.len(),
            })?;
            rows.push(row.clone());
        }
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Check the width and header invariants.
    ///
    /// Deserialized snapshots bypass the constructors, so backends call this
    /// after reading.
    pub fn validate(&self) -> Result<(), TableError> {
        check_unique(&self.columns)?;
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(TableError::RowWidth {
                    row: index,
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(())
    }
}

fn check_unique(columns: &[String]) -> Result<(), TableError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(TableError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Table {
        Table::from_lists(vec![
            vec!["First Name".to_string(), "Age".to_string()],
            vec!["Oski".to_string(), "21".to_string()],
            vec!["Carol".to_string(), "34".to_string()],
        ])
        .unwrap()
    }

    #[test]
    fn test_from_lists_uses_first_list_as_header() {
        let table = names();
        assert_eq!(table.columns(), &["First Name".to_string(), "Age".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "First Name").unwrap(), &Value::from("Carol"));
    }

    #[test]
    fn test_from_lists_requires_header() {
        assert_eq!(Table::from_lists(vec![]), Err(TableError::MissingHeader));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(["a", "b"]).unwrap();
        let err = table.push_row(vec![Value::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            TableError::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Table::new(["a", "a"]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_select_rows_preserves_requested_order() {
        let table = names().with_row(["Steve", "73"]).unwrap();
        let picked = table.select_rows(&[0, 2]).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.row(0), table.row(0));
        assert_eq!(picked.row(1), table.row(2));
        assert!(table.select_rows(&[5]).is_err());
    }

    #[test]
    fn test_value_json_is_untagged() {
        let table = Table::new(["n", "x", "s", "b", "z"])
            .unwrap()
            .with_row([
                Value::Int(3),
                Value::Float(1.5),
                Value::from("hi"),
                Value::Bool(true),
                Value::Null,
            ])
            .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains(r#"[3,1.5,"hi",true,null]"#));
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_value_numeric_views() {
        assert_eq!(Value::from("42").as_i64(), Some(42));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Null.as_i64(), None);
        assert_eq!(Value::Null.to_string(), "");
    }
}
