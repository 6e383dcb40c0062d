//! Stagecraft Test Utilities
//!
//! Fixture tables, seeded catalogs and throwaway catalog directories shared
//! by the Stagecraft test suites.
//!
//! # Usage
//!
//! ```rust,ignore
//! use stagecraft_test_utils::{names_table, seeded_catalog, TempCatalog};
//!
//! let catalog = seeded_catalog();
//! assert_eq!(catalog.read("Names").unwrap(), names_table());
//!
//! let dir = TempCatalog::new().unwrap();
//! let persisted = dir.open().unwrap();
//! // Directory is removed when `dir` goes out of scope
//! ```

pub mod fixtures;
pub mod temp;

pub use fixtures::{
    existing_table, fields, names_table, people_table, seeded_catalog, EXISTING, NAMES, PEOPLE,
};
pub use temp::TempCatalog;
