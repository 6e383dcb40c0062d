//! The persisted table catalog contract.

use crate::error::{CatalogError, Result};
use crate::table::{Table, TableError, Value};
use std::collections::BTreeSet;

/// Values of one column, top to bottom, as a backend streams them.
pub type CellIter<'a> = Box<dyn Iterator<Item = Result<Value>> + 'a>;

/// Durable storage for named tables.
///
/// Only the first four methods are required. The remaining helpers have
/// default implementations in terms of [`TableCatalog::read`]; backends that
/// can answer them without materializing a whole snapshot should override
/// them, since column iteration over large tables goes through
/// `scan_column`.
pub trait TableCatalog: Send {
    /// Names of every persisted table.
    fn list_names(&self) -> Result<BTreeSet<String>>;

    /// Full snapshot of `name`. Fails with `NotFound` when absent.
    fn read(&self, name: &str) -> Result<Table>;

    /// Create or replace `name` with `table`.
    fn overwrite(&mut self, name: &str, table: &Table) -> Result<()>;

    /// Remove `name`. Fails with `NotFound` when absent.
    fn drop_table(&mut self, name: &str) -> Result<()>;

    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.list_names()?.contains(name))
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.read(name)?.len())
    }

    fn column_names(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.read(name)?.columns().to_vec())
    }

    /// One cell, addressed by row index and column name.
    fn read_cell(&self, name: &str, row: usize, column: &str) -> Result<Value> {
        let table = self.read(name)?;
        Ok(table.cell(row, column)?.clone())
    }

    /// Stream one column. Fails up front when the table or column is absent.
    fn scan_column<'a>(&'a self, name: &'a str, column: &'a str) -> Result<CellIter<'a>> {
        if !self.column_names(name)?.iter().any(|c| c == column) {
            return Err(TableError::UnknownColumn(column.to_string()).into());
        }
        let len = self.row_count(name)?;
        Ok(Box::new(
            (0..len).map(move |row| self.read_cell(name, row, column)),
        ))
    }
}

impl<C: TableCatalog + ?Sized> TableCatalog for Box<C> {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        (**self).list_names()
    }

    fn read(&self, name: &str) -> Result<Table> {
        (**self).read(name)
    }

    fn overwrite(&mut self, name: &str, table: &Table) -> Result<()> {
        (**self).overwrite(name, table)
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        (**self).drop_table(name)
    }

    fn contains(&self, name: &str) -> Result<bool> {
        (**self).contains(name)
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        (**self).row_count(name)
    }

    fn column_names(&self, name: &str) -> Result<Vec<String>> {
        (**self).column_names(name)
    }

    fn read_cell(&self, name: &str, row: usize, column: &str) -> Result<Value> {
        (**self).read_cell(name, row, column)
    }

    fn scan_column<'a>(&'a self, name: &'a str, column: &'a str) -> Result<CellIter<'a>> {
        (**self).scan_column(name, column)
    }
}

/// Reject names no backend can store faithfully.
pub fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::invalid_name(name));
    }
    Ok(())
}
