//! Handles returned to stage bodies for input components.

use super::ComponentId;
use crate::error::{Result, StageError};
use crate::hydrate::InputError;
use serde::{Deserialize, Serialize};

/// Hydration state of an input component.
#[derive(Debug, Clone, PartialEq)]
pub enum InputState<T> {
    /// Layout pass: nothing was submitted yet.
    Unbound,
    Ready(T),
    /// The submitted value could not be used.
    Invalid(InputError),
}

/// An input component as seen by business logic.
#[derive(Debug, Clone, PartialEq)]
pub struct Input<T> {
    id: ComponentId,
    label: String,
    state: InputState<T>,
}

impl<T> Input<T> {
    pub(crate) fn unbound(id: ComponentId, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            state: InputState::Unbound,
        }
    }

    pub(crate) fn hydrated(
        id: ComponentId,
        label: &str,
        value: std::result::Result<T, InputError>,
    ) -> Self {
        let state = match value {
            Ok(v) => InputState::Ready(v),
            Err(e) => InputState::Invalid(e),
        };
        Self {
            id,
            label: label.to_string(),
            state,
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> &InputState<T> {
        &self.state
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            InputState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&InputError> {
        match &self.state {
            InputState::Invalid(e) => Some(e),
            _ => None,
        }
    }

    /// The hydrated value.
    ///
    /// Reading before submission is a precondition violation; reading an
    /// invalid value yields the recoverable input error, so `?` inside a
    /// stage body ends the request with a user-facing message.
    pub fn get(&self) -> Result<&T> {
        match &self.state {
            InputState::Ready(v) => Ok(v),
            InputState::Invalid(e) => Err(StageError::Input(e.clone())),
            InputState::Unbound => Err(StageError::precondition(format!(
                "value of {} ('{}') read before user input was received; \
                 gate business logic on submitted()",
                self.id, self.label
            ))),
        }
    }
}

/// A table picked by a table selector, resolved through the changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChoice {
    pub name: String,
    pub columns: Vec<String>,
}

/// A (table, column) back-reference recorded by a column selector.
///
/// Cells are resolved on demand through
/// [`TableChangeset::column_cells`](crate::changeset::TableChangeset::column_cells)
/// instead of copying the column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}
