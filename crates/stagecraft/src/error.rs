//! Top-level error type for stage execution.

use crate::approval::ApprovalError;
use crate::changeset::ChangesetError;
use crate::hydrate::InputError;
use stagecraft_catalog::{CatalogError, TableError};
use thiserror::Error;

/// Stage operation result type.
pub type Result<T> = std::result::Result<T, StageError>;

/// Errors surfaced by stage execution, changesets and approvals.
///
/// Only [`StageError::Input`] is recoverable: the runner turns it into a
/// user-facing message and discards the request's staged changes. Every
/// other variant is a hard failure of the request.
#[derive(Error, Debug)]
pub enum StageError {
    /// A submitted value could not be used for its component
    #[error(transparent)]
    Input(#[from] InputError),

    /// Programmer error: misuse of the stage API or a broken precondition
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Stage already registered: {0}")]
    DuplicateStage(String),

    #[error("Tool state lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Changeset(#[from] ChangesetError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Table(#[from] TableError),

    /// Anything else raised by a stage body
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Create a precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Whether this error is a recoverable input problem.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}
