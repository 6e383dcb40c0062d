//! Results shown to the user after a stage is handled.

use crate::hydrate::InputValue;
use serde::{Deserialize, Serialize};
use stagecraft_catalog::{Table, Value};

/// A titled list of labelled sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    pub title: String,
    pub sections: Vec<ResultSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSection {
    pub label: String,
    pub content: ResultContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultContent {
    Text { text: String },
    Table { name: String, table: Table },
    Value { value: Value },
}

impl ResultsPayload {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn text(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.sections.push(ResultSection {
            label: label.into(),
            content: ResultContent::Text { text: text.into() },
        });
        self
    }

    pub fn table(mut self, label: impl Into<String>, name: impl Into<String>, table: Table) -> Self {
        self.sections.push(ResultSection {
            label: label.into(),
            content: ResultContent::Table {
                name: name.into(),
                table,
            },
        });
        self
    }

    pub fn value(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sections.push(ResultSection {
            label: label.into(),
            content: ResultContent::Value {
                value: value.into(),
            },
        });
        self
    }

    /// Add a hydrated input value.
    pub fn input(self, label: impl Into<String>, value: &InputValue) -> Self {
        self.value(label, value.to_cell())
    }
}
