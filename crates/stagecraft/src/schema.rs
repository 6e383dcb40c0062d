//! Declared form schemas.
//!
//! A [`FormSchema`] lists a stage's input slots up front. The layout pass and
//! the handling pass both create components by walking the same list, so
//! identities cannot drift between passes no matter what the handler does.

use crate::component::{ColumnRef, Input, TableChoice};
use crate::error::{Result, StageError};
use crate::hydrate::{InputValue, ValueType};
use crate::stage::{Stage, StageScope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotKind {
    Text,
    UserInput { expected: ValueType },
    Selector { options: Vec<String> },
    TableSelector,
    /// Column of the table chosen in slot `table`
    ColumnSelector { table: String },
    Submit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub label: String,
    pub kind: SlotKind,
}

/// An ordered list of named slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    slots: Vec<Slot>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(mut self, name: &str, label: &str, kind: SlotKind) -> Self {
        self.slots.push(Slot {
            name: name.to_string(),
            label: label.to_string(),
            kind,
        });
        self
    }

    pub fn text(self, name: &str, text: &str) -> Self {
        self.slot(name, text, SlotKind::Text)
    }

    pub fn user_input(self, name: &str, label: &str, expected: ValueType) -> Self {
        self.slot(name, label, SlotKind::UserInput { expected })
    }

    pub fn selector<I, S>(self, name: &str, label: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        self.slot(name, label, SlotKind::Selector { options })
    }

    pub fn table_selector(self, name: &str, label: &str) -> Self {
        self.slot(name, label, SlotKind::TableSelector)
    }

    pub fn column_selector(self, name: &str, label: &str, table: &str) -> Self {
        self.slot(
            name,
            label,
            SlotKind::ColumnSelector {
                table: table.to_string(),
            },
        )
    }

    pub fn submit(self, name: &str, label: &str) -> Self {
        self.slot(name, label, SlotKind::Submit)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Check that slot names are unique and every column selector refers to
    /// an earlier table selector.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut table_slots = HashSet::new();
        for slot in &self.slots {
            if !seen.insert(slot.name.as_str()) {
                return Err(StageError::precondition(format!(
                    "duplicate form slot '{}'",
                    slot.name
                )));
            }
            match &slot.kind {
                SlotKind::TableSelector => {
                    table_slots.insert(slot.name.as_str());
                }
                SlotKind::ColumnSelector { table } if !table_slots.contains(table.as_str()) => {
                    return Err(StageError::precondition(format!(
                        "column slot '{}' refers to '{}', which is not an earlier table slot",
                        slot.name, table
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Create every slot's component in order.
    pub fn render(&self, scope: &mut StageScope<'_>) -> Result<HydratedForm> {
        let mut form = HydratedForm::default();
        for slot in &self.slots {
            let label = slot.label.as_str();
            let value = match &slot.kind {
                SlotKind::Text => {
                    scope.text(label)?;
                    continue;
                }
                SlotKind::Submit => {
                    scope.submit(label)?;
                    continue;
                }
                SlotKind::UserInput { expected } => {
                    SlotValue::Value(scope.user_input(label, *expected)?)
                }
                SlotKind::Selector { options } => {
                    SlotValue::Choice(scope.selector(label, options.iter().cloned())?)
                }
                SlotKind::TableSelector => SlotValue::Table(scope.table_selector(label)?),
                SlotKind::ColumnSelector { table } => {
                    let table = match form.values.get(table) {
                        Some(SlotValue::Table(input)) => input,
                        _ => {
                            return Err(StageError::precondition(format!(
                                "column slot '{}' has no table slot '{}'",
                                slot.name, table
                            )))
                        }
                    };
                    SlotValue::Column(scope.column_selector(label, table)?)
                }
            };
            form.values.insert(slot.name.clone(), value);
        }
        Ok(form)
    }

    /// A stage that renders this schema and, once submitted, calls
    /// `handler` with the hydrated slots.
    pub fn into_stage<F>(self, name: impl Into<String>, handler: F) -> Result<Stage>
    where
        F: Fn(&mut StageScope<'_>, &HydratedForm) -> Result<()> + Send + Sync + 'static,
    {
        self.validate()?;
        Ok(Stage::new(name, move |scope| {
            let form = self.render(scope)?;
            if scope.submitted() {
                handler(scope, &form)?;
            }
            Ok(())
        }))
    }
}

/// The hydrated value of one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Value(Input<InputValue>),
    Choice(Input<String>),
    Table(Input<TableChoice>),
    Column(Input<ColumnRef>),
}

/// Hydrated slots by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydratedForm {
    values: BTreeMap<String, SlotValue>,
}

impl HydratedForm {
    pub fn get(&self, name: &str) -> Option<&SlotValue> {
        self.values.get(name)
    }

    fn missing(name: &str, wanted: &str) -> StageError {
        StageError::precondition(format!("form has no {} slot named '{}'", wanted, name))
    }

    pub fn value(&self, name: &str) -> Result<&InputValue> {
        match self.values.get(name) {
            Some(SlotValue::Value(input)) => input.get(),
            _ => Err(Self::missing(name, "input")),
        }
    }

    pub fn choice(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(SlotValue::Choice(input)) => input.get().map(String::as_str),
            _ => Err(Self::missing(name, "selector")),
        }
    }

    pub fn table(&self, name: &str) -> Result<&TableChoice> {
        match self.values.get(name) {
            Some(SlotValue::Table(input)) => input.get(),
            _ => Err(Self::missing(name, "table")),
        }
    }

    pub fn column(&self, name: &str) -> Result<&ColumnRef> {
        match self.values.get(name) {
            Some(SlotValue::Column(input)) => input.get(),
            _ => Err(Self::missing(name, "column")),
        }
    }
}
