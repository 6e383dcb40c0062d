//! Throwaway catalog directories.

use anyhow::{Context, Result};
use stagecraft_catalog::{JsonDirCatalog, Table, TableCatalog};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// RAII guard for a JSON catalog directory.
///
/// Every [`TempCatalog::open`] returns a fresh handle on the same directory,
/// which stands in for a process restart. The directory is removed on Drop.
pub struct TempCatalog {
    dir: TempDir,
}

impl TempCatalog {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp catalog dir")?;
        debug!(dir = %dir.path().display(), "Created temp catalog");
        Ok(Self { dir })
    }

    /// A temp catalog pre-populated with `tables`.
    pub fn seeded<'a, I>(tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Table)>,
    {
        let temp = Self::new()?;
        let mut catalog = temp.open()?;
        for (name, table) in tables {
            catalog
                .overwrite(name, &table)
                .with_context(|| format!("Failed to seed table '{}'", name))?;
        }
        Ok(temp)
    }

    pub fn open(&self) -> Result<JsonDirCatalog> {
        JsonDirCatalog::open(self.tables_dir()).context("Failed to open temp catalog")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where tables live.
    pub fn tables_dir(&self) -> PathBuf {
        self.dir.path().join("tables")
    }

    /// A sibling directory for pending approvals.
    pub fn approvals_dir(&self) -> PathBuf {
        self.dir.path().join("approvals")
    }
}
