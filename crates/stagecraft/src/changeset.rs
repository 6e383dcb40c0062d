//! Copy-on-write overlay over a persisted table catalog.
//!
//! Business logic reads and writes tables through a [`TableChangeset`].
//! Writes are staged as whole replacement snapshots or deletion markers and
//! only reach the catalog on [`TableChangeset::flush`]. A name is never both
//! staged for saving and marked for deletion: the later operation evicts the
//! name from the other set.

use crate::component::ColumnRef;
use stagecraft_catalog::catalog::check_name;
use stagecraft_catalog::{CatalogError, CellIter, Table, TableCatalog, TableError, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ChangesetError {
    #[error("Table not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ChangesetError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ChangesetError>;

/// What a flush wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub saved: Vec<String>,
    pub dropped: Vec<String>,
}

impl FlushSummary {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.dropped.is_empty()
    }
}

/// Staged table mutations for one tool.
pub struct TableChangeset {
    catalog: Box<dyn TableCatalog>,
    base: BTreeSet<String>,
    pending_save: BTreeMap<String, Table>,
    pending_delete: BTreeSet<String>,
}

impl std::fmt::Debug for TableChangeset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableChangeset")
            .field("base", &self.base)
            .field("pending_save", &self.pending_save.keys().collect::<Vec<_>>())
            .field("pending_delete", &self.pending_delete)
            .finish()
    }
}

impl TableChangeset {
    /// Wrap `catalog`, recording the names it currently holds as the base.
    pub fn open(catalog: Box<dyn TableCatalog>) -> Result<Self> {
        let base = catalog.list_names()?;
        debug!(tables = base.len(), "Opened table changeset");
        Ok(Self {
            catalog,
            base,
            pending_save: BTreeMap::new(),
            pending_delete: BTreeSet::new(),
        })
    }

    /// Current contents of `name`, staged version first.
    pub fn get(&self, name: &str) -> Result<Cow<'_, Table>> {
        if let Some(table) = self.pending_save.get(name) {
            return Ok(Cow::Borrowed(table));
        }
        if self.pending_delete.contains(name) || !self.base.contains(name) {
            return Err(ChangesetError::not_found(name));
        }
        Ok(Cow::Owned(self.catalog.read(name)?))
    }

    /// Stage `table` as the full replacement for `name`.
    pub fn set(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        self.pending_delete.remove(&name);
        debug!(table = %name, rows = table.len(), "Staged table");
        self.pending_save.insert(name, table);
    }

    /// Stage the removal of `name`.
    ///
    /// A persisted table is marked for deletion. A table that only exists as
    /// a staged snapshot is simply unstaged, since there is nothing to drop.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let staged = self.pending_save.remove(name).is_some();
        if self.base.contains(name) {
            self.pending_delete.insert(name.to_string());
        } else if !staged {
            return Err(ChangesetError::not_found(name));
        }
        debug!(table = %name, "Staged table deletion");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        if self.pending_delete.contains(name) {
            return false;
        }
        self.base.contains(name) || self.pending_save.contains_key(name)
    }

    /// Every visible table name.
    pub fn names(&self) -> BTreeSet<String> {
        self.base
            .iter()
            .chain(self.pending_save.keys())
            .filter(|n| !self.pending_delete.contains(*n))
            .cloned()
            .collect()
    }

    /// Column names of a visible table.
    pub fn columns(&self, name: &str) -> Result<Vec<String>> {
        if let Some(table) = self.pending_save.get(name) {
            return Ok(table.columns().to_vec());
        }
        if !self.contains(name) {
            return Err(ChangesetError::not_found(name));
        }
        Ok(self.catalog.column_names(name)?)
    }

    /// Number of rows of a visible table.
    pub fn row_count(&self, name: &str) -> Result<usize> {
        if let Some(table) = self.pending_save.get(name) {
            return Ok(table.len());
        }
        if !self.contains(name) {
            return Err(ChangesetError::not_found(name));
        }
        Ok(self.catalog.row_count(name)?)
    }

    /// Lazily resolve the cells of a selected column.
    ///
    /// Persisted tables are streamed through the catalog, so iterating a
    /// column never materializes the whole table.
    pub fn column_cells<'a>(&'a self, column: &'a ColumnRef) -> Result<ColumnCells<'a>> {
        if let Some(table) = self.pending_save.get(&column.table) {
            let index = table.column_index(&column.column).ok_or_else(|| {
                CatalogError::Table(TableError::UnknownColumn(column.column.clone()))
            })?;
            return Ok(ColumnCells {
                source: CellSource::Staged {
                    rows: table.rows().iter(),
                    index,
                },
            });
        }
        if !self.contains(&column.table) {
            return Err(ChangesetError::not_found(&column.table));
        }
        let cells = self.catalog.scan_column(&column.table, &column.column)?;
        Ok(ColumnCells {
            source: CellSource::Persisted(cells),
        })
    }

    /// Write every staged change to the catalog and clear the overlay.
    ///
    /// The overlay is cleared and the base re-read whether or not the write
    /// succeeds. Names are checked before anything is written, so an
    /// unstorable name fails the flush without touching the catalog.
    pub fn flush(&mut self) -> Result<FlushSummary> {
        let written = self.write_pending();
        self.pending_save.clear();
        self.pending_delete.clear();
        let refreshed = self.refresh_base();

        let summary = match written {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Flush failed; discarded staged table changes");
                if let Err(refresh) = refreshed {
                    warn!(error = %refresh, "Failed to re-read table names");
                }
                return Err(e);
            }
        };
        refreshed?;

        if !summary.is_empty() {
            info!(
                saved = summary.saved.len(),
                dropped = summary.dropped.len(),
                "Flushed table changeset"
            );
        }
        Ok(summary)
    }

    fn write_pending(&mut self) -> Result<FlushSummary> {
        for (name, table) in &self.pending_save {
            check_name(name)?;
            table.validate().map_err(CatalogError::from)?;
        }

        let mut summary = FlushSummary::default();
        for (name, table) in &self.pending_save {
            self.catalog.overwrite(name, table)?;
            summary.saved.push(name.clone());
        }
        for name in &self.pending_delete {
            match self.catalog.drop_table(name) {
                Ok(()) => summary.dropped.push(name.clone()),
                Err(e) if e.is_not_found() => {
                    warn!(table = %name, "Table already absent from catalog");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(summary)
    }

    /// Discard every staged change without touching the catalog.
    pub fn clear(&mut self) {
        if self.has_pending() {
            debug!(
                saves = self.pending_save.len(),
                deletes = self.pending_delete.len(),
                "Discarded staged table changes"
            );
        }
        self.pending_save.clear();
        self.pending_delete.clear();
    }

    /// Re-read the base names from the catalog.
    pub fn refresh_base(&mut self) -> Result<()> {
        self.base = self.catalog.list_names()?;
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_save.is_empty() || !self.pending_delete.is_empty()
    }

    pub fn pending_saves(&self) -> &BTreeMap<String, Table> {
        &self.pending_save
    }

    pub fn pending_deletes(&self) -> &BTreeSet<String> {
        &self.pending_delete
    }

    /// Whether `name` exists in the catalog, ignoring staged changes.
    pub fn is_persisted(&self, name: &str) -> bool {
        self.base.contains(name)
    }

    /// The underlying catalog, for read-only inspection.
    pub fn catalog(&self) -> &dyn TableCatalog {
        self.catalog.as_ref()
    }
}

enum CellSource<'a> {
    Staged {
        rows: std::slice::Iter<'a, Vec<Value>>,
        index: usize,
    },
    Persisted(CellIter<'a>),
}

/// Iterator over one column's cells, top to bottom.
pub struct ColumnCells<'a> {
    source: CellSource<'a>,
}

impl Iterator for ColumnCells<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            CellSource::Staged { rows, index } => rows.next().map(|row| Ok(row[*index].clone())),
            CellSource::Persisted(cells) => cells.next().map(|cell| cell.map_err(Into::into)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            CellSource::Staged { rows, .. } => rows.size_hint(),
            CellSource::Persisted(cells) => cells.size_hint(),
        }
    }
}
