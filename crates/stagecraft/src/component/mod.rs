//! UI components created by stage bodies.
//!
//! Every component created while a stage body runs receives the next
//! identity from the execution's [`ComponentRegistry`]: `component_0`,
//! `component_1`, ... in creation order, one counter shared by all kinds.
//! The identity is the only thing that ties a component in the layout pass
//! to the same component in the handling pass, so a stage body must create
//! the same components in the same order in both passes. Nothing checks
//! this: if the order diverges, submitted values are attributed to the wrong
//! component.

mod input;
mod registry;

pub use input::{ColumnRef, Input, InputState, TableChoice};
pub use registry::ComponentRegistry;

use crate::hydrate::ValueType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every component identity.
pub const COMPONENT_ID_PREFIX: &str = "component_";

/// Identity of one component within a stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("{}{}", COMPONENT_ID_PREFIX, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Text,
    UserInput,
    Selector,
    TableSelector,
    ColumnSelector,
    Submit,
}

impl ComponentKind {
    /// Whether the component reads a submitted value.
    pub fn takes_input(&self) -> bool {
        matches!(
            self,
            Self::UserInput | Self::Selector | Self::TableSelector | Self::ColumnSelector
        )
    }
}

/// A table offered by a table selector, with its columns for the dependent
/// column selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOption {
    pub name: String,
    pub columns: Vec<String>,
}

/// Kind-specific render data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutDetail {
    Text,
    Input { expected: ValueType },
    Options { options: Vec<String> },
    Tables { tables: Vec<TableOption> },
    Column { table_selector: ComponentId },
    Submit,
}

/// One render instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub label: String,
    pub detail: LayoutDetail,
}

/// The layout descriptor of a stage: its render instructions in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub stage: String,
    pub nodes: Vec<LayoutNode>,
}

impl Layout {
    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.nodes.iter().map(|n| &n.id)
    }

    /// Identities of components that expect a submitted value.
    pub fn input_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.nodes
            .iter()
            .filter(|n| n.kind.takes_input())
            .map(|n| &n.id)
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_format() {
        assert_eq!(ComponentId::from_index(0).as_str(), "component_0");
        assert_eq!(ComponentId::from_index(12).to_string(), "component_12");
    }

    #[test]
    fn test_layout_detail_json() {
        let node = LayoutNode {
            id: ComponentId::from_index(3),
            kind: ComponentKind::UserInput,
            label: "Age".to_string(),
            detail: LayoutDetail::Input {
                expected: ValueType::Integer,
            },
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "component_3");
        assert_eq!(json["kind"], "user_input");
        assert_eq!(json["detail"]["type"], "input");
        assert_eq!(json["detail"]["expected"], "integer");
    }
}
