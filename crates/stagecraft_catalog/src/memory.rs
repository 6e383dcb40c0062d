//! In-process catalog backend.

use crate::catalog::{check_name, CellIter, TableCatalog};
use crate::error::{CatalogError, Result};
use crate::table::{Table, TableError, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Catalog held entirely in memory. Contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, Table>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with a table.
    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    fn get(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::not_found(name))
    }
}

impl TableCatalog for MemoryCatalog {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> Result<Table> {
        self.get(name).cloned()
    }

    fn overwrite(&mut self, name: &str, table: &Table) -> Result<()> {
        check_name(name)?;
        table.validate()?;
        self.tables.insert(name.to_string(), table.clone());
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CatalogError::not_found(name))
    }

    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.tables.contains_key(name))
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.get(name)?.len())
    }

    fn column_names(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.get(name)?.columns().to_vec())
    }

    fn read_cell(&self, name: &str, row: usize, column: &str) -> Result<Value> {
        Ok(self.get(name)?.cell(row, column)?.clone())
    }

    fn scan_column<'a>(&'a self, name: &'a str, column: &'a str) -> Result<CellIter<'a>> {
        let table = self.get(name)?;
        let col = table
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        Ok(Box::new(table.rows().iter().map(move |row| Ok(row[col].clone()))))
    }
}
