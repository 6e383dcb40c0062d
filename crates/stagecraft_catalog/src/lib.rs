//! Persisted table catalog for Stagecraft tools.
//!
//! Stage bodies never talk to storage directly. They go through a
//! `TableChangeset` (in the `stagecraft` crate), which in turn only needs the
//! four calls of [`TableCatalog`]:
//!
//! ```rust,ignore
//! use stagecraft_catalog::{MemoryCatalog, Table, TableCatalog};
//!
//! let mut catalog = MemoryCatalog::new();
//! catalog.overwrite("Names", &Table::from_lists(vec![
//!     vec!["First Name".into()],
//!     vec!["Oski".into()],
//! ])?)?;
//! assert!(catalog.list_names()?.contains("Names"));
//! ```
//!
//! # Modules
//!
//! - [`table`]: the snapshot model (`Table`, `Value`)
//! - [`catalog`]: the `TableCatalog` contract
//! - [`memory`]: in-process backend
//! - [`json_dir`]: one JSON Lines file per table

pub mod catalog;
mod error;
pub mod json_dir;
pub mod memory;
pub mod table;

pub use catalog::{CellIter, TableCatalog};
pub use error::{CatalogError, Result};
pub use json_dir::JsonDirCatalog;
pub use memory::MemoryCatalog;
pub use table::{Table, TableError, Value};
