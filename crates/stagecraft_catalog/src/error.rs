//! Error types for the catalog layer.

use crate::table::TableError;
use thiserror::Error;

/// Catalog operation result type.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table not present in the catalog
    #[error("Table not found: {0}")]
    NotFound(String),

    /// Table name cannot be stored by this backend
    #[error("Invalid table name: {0}")]
    InvalidName(String),

    /// Malformed table snapshot
    #[error("Invalid table: {0}")]
    Table(#[from] TableError),

    /// Stored file does not match its own header
    #[error("Corrupt table file for {name}: {reason}")]
    Corrupt { name: String, reason: String },
}

impl CatalogError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    pub fn corrupt(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the table does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
