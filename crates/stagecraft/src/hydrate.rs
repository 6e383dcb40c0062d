//! Input hydration: binding submitted values to components by identity.
//!
//! Each input component looks up its own identity in the submitted field map
//! and coerces the raw strings to its declared type. Coercion problems become
//! [`InputError`]s attached to the component; they are reported to the user
//! and never abort the rest of the pass.

use crate::changeset::TableChangeset;
use crate::component::{ColumnRef, ComponentId, TableChoice};
use crate::error::{Result, StageError};
use crate::form::{FieldValue, Submission};
use serde::{Deserialize, Serialize};
use stagecraft_catalog::Value;
use std::fmt;
use thiserror::Error;

/// Declared type of a user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    Integer,
    Float,
    Boolean,
    /// Every submitted value, in order
    List,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Text => "text",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::List => "list",
        };
        f.write_str(name)
    }
}

/// A coerced input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl InputValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InputValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            InputValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InputValue::Integer(v) => Some(*v as f64),
            InputValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            InputValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            InputValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Cell representation for storing the value in a table. Lists are
    /// joined with `", "`.
    pub fn to_cell(&self) -> Value {
        match self {
            InputValue::Boolean(v) => Value::Bool(*v),
            InputValue::Integer(v) => Value::Int(*v),
            InputValue::Float(v) => Value::Float(*v),
            InputValue::Text(v) => Value::Text(v.clone()),
            InputValue::List(v) => Value::Text(v.join(", ")),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::List(v) => f.write_str(&v.join(", ")),
            other => write!(f, "{}", other.to_cell()),
        }
    }
}

/// A submitted value that cannot be used for its component.
///
/// These are user-facing: the runner reports them alongside the stage's
/// response instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum InputError {
    #[error("An error occurred while trying to cast the value < {value} > to {expected} ({component})")]
    Coercion {
        component: String,
        value: String,
        expected: ValueType,
    },

    #[error("Table '{table}' selected in {component} does not exist")]
    UnknownTable { component: String, table: String },

    #[error("Column '{column}' selected in {component} does not exist in table '{table}'")]
    UnknownColumn {
        component: String,
        table: String,
        column: String,
    },

    #[error("'{value}' is not one of the options of {component}")]
    InvalidOption { component: String, value: String },

    #[error("{component} depends on {table_selector}, which has no valid table")]
    NoTableSelected {
        component: String,
        table_selector: String,
    },
}

impl InputError {
    /// Identity of the component the error belongs to.
    pub fn component(&self) -> &str {
        match self {
            InputError::Coercion { component, .. }
            | InputError::UnknownTable { component, .. }
            | InputError::UnknownColumn { component, .. }
            | InputError::InvalidOption { component, .. }
            | InputError::NoTableSelected { component, .. } => component,
        }
    }
}

/// Look up the raw submitted value of a component.
///
/// A missing key means the submission does not match the layout this body
/// produced, typically because components were created after user input was
/// received or the body's control flow differs between passes.
pub fn submitted_value(submission: &Submission, id: &ComponentId) -> Result<FieldValue> {
    submission.get(id.as_str()).ok_or_else(|| {
        StageError::precondition(format!(
            "no submitted value for {id}; were components created after user input \
             was received, or in a different order than in the layout pass?"
        ))
    })
}

/// Coerce a raw submitted value to `expected`.
pub fn coerce(
    id: &ComponentId,
    raw: &FieldValue,
    expected: ValueType,
) -> std::result::Result<InputValue, InputError> {
    let fail = || InputError::Coercion {
        component: id.to_string(),
        value: raw.values().join(", "),
        expected,
    };

    if expected == ValueType::List {
        return Ok(InputValue::List(
            raw.values().into_iter().map(str::to_string).collect(),
        ));
    }

    let text = raw.as_scalar().ok_or_else(fail)?;
    match expected {
        ValueType::Text => Ok(InputValue::Text(text.to_string())),
        ValueType::Integer => text
            .trim()
            .parse::<i64>()
            .map(InputValue::Integer)
            .map_err(|_| fail()),
        ValueType::Float => text
            .trim()
            .parse::<f64>()
            .map(InputValue::Float)
            .map_err(|_| fail()),
        ValueType::Boolean => parse_bool(text).map(InputValue::Boolean).ok_or_else(fail),
        ValueType::List => unreachable!("handled above"),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Resolve a selector value against its options.
pub fn resolve_option(
    id: &ComponentId,
    raw: &FieldValue,
    options: &[String],
) -> std::result::Result<String, InputError> {
    let invalid = || InputError::InvalidOption {
        component: id.to_string(),
        value: raw.values().join(", "),
    };
    let value = raw.as_scalar().ok_or_else(invalid)?;
    if options.iter().any(|o| o == value) {
        Ok(value.to_string())
    } else {
        Err(invalid())
    }
}

/// Resolve a table name through the changeset, so staged creations are
/// selectable and staged deletions are not.
pub fn resolve_table(
    id: &ComponentId,
    raw: &FieldValue,
    tables: &TableChangeset,
) -> Result<std::result::Result<TableChoice, InputError>> {
    let name = raw.values().join(", ");
    let unknown = || InputError::UnknownTable {
        component: id.to_string(),
        table: name.clone(),
    };
    let Some(scalar) = raw.as_scalar() else {
        return Ok(Err(unknown()));
    };
    if !tables.contains(scalar) {
        return Ok(Err(unknown()));
    }
    let columns = tables.columns(scalar)?;
    Ok(Ok(TableChoice {
        name: scalar.to_string(),
        columns,
    }))
}

/// Resolve a column name within an already-resolved table.
pub fn resolve_column(
    id: &ComponentId,
    raw: &FieldValue,
    table: &TableChoice,
) -> std::result::Result<ColumnRef, InputError> {
    let unknown = || InputError::UnknownColumn {
        component: id.to_string(),
        table: table.name.clone(),
        column: raw.values().join(", "),
    };
    let column = raw.as_scalar().ok_or_else(unknown)?;
    if table.columns.iter().any(|c| c == column) {
        Ok(ColumnRef {
            table: table.name.clone(),
            column: column.to_string(),
        })
    } else {
        Err(unknown())
    }
}
