//! Component identity assignment and layout accumulation.

use super::{ComponentId, ComponentKind, LayoutDetail, LayoutNode};
use crate::context::Phase;
use crate::error::Result;
use tracing::debug;

/// Label of the submit control added when a stage body creates none.
pub const DEFAULT_SUBMIT_LABEL: &str = "Submit";

/// Hands out sequential identities for one stage execution and, during the
/// layout pass, records a render instruction per component.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    next: usize,
    nodes: Vec<LayoutNode>,
    submit_added: bool,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next identity.
    ///
    /// `detail` is only evaluated in the layout phase, so components whose
    /// render data needs storage access (table selectors) pay for it once.
    pub fn register<F>(
        &mut self,
        phase: Phase,
        kind: ComponentKind,
        label: &str,
        detail: F,
    ) -> Result<ComponentId>
    where
        F: FnOnce() -> Result<LayoutDetail>,
    {
        let id = ComponentId::from_index(self.next);
        self.next += 1;
        if kind == ComponentKind::Submit {
            self.submit_added = true;
        }

        if phase == Phase::Layout {
            self.nodes.push(LayoutNode {
                id: id.clone(),
                kind,
                label: label.to_string(),
                detail: detail()?,
            });
        }

        debug!(component = %id, ?kind, ?phase, "Registered component");
        Ok(id)
    }

    /// Number of identities issued so far.
    pub fn issued(&self) -> usize {
        self.next
    }

    pub fn submit_added(&self) -> bool {
        self.submit_added
    }

    /// Take the accumulated layout, adding a submit control if the body
    /// created none.
    pub fn finish_layout(&mut self) -> Vec<LayoutNode> {
        if !self.submit_added {
            let id = ComponentId::from_index(self.next);
            self.next += 1;
            self.submit_added = true;
            debug!(component = %id, "Synthesized submit control");
            self.nodes.push(LayoutNode {
                id,
                kind: ComponentKind::Submit,
                label: DEFAULT_SUBMIT_LABEL.to_string(),
                detail: LayoutDetail::Submit,
            });
        }
        std::mem::take(&mut self.nodes)
    }

    pub fn reset(&mut self) {
        self.next = 0;
        self.nodes.clear();
        self.submit_added = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> Result<LayoutDetail> {
        Ok(LayoutDetail::Text)
    }

    #[test]
    fn test_identities_are_sequential_across_kinds() {
        let mut registry = ComponentRegistry::new();
        let a = registry
            .register(Phase::Layout, ComponentKind::Text, "hello", text)
            .unwrap();
        let b = registry
            .register(Phase::Layout, ComponentKind::UserInput, "name", text)
            .unwrap();
        assert_eq!(a.as_str(), "component_0");
        assert_eq!(b.as_str(), "component_1");
        assert_eq!(registry.issued(), 2);
    }

    #[test]
    fn test_handling_phase_records_no_layout() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Phase::Handling, ComponentKind::Text, "hello", || -> Result<LayoutDetail> {
                panic!("detail must not be built while handling")
            })
            .unwrap();
        assert_eq!(registry.issued(), 1);
        // Only the synthesized submit is present
        let nodes = registry.finish_layout();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_submit_synthesized_once() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Phase::Layout, ComponentKind::Text, "hello", text)
            .unwrap();
        let nodes = registry.finish_layout();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].kind, ComponentKind::Submit);
        assert_eq!(nodes[1].id.as_str(), "component_1");
        assert_eq!(nodes[1].label, DEFAULT_SUBMIT_LABEL);
    }

    #[test]
    fn test_explicit_submit_not_duplicated() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Phase::Layout, ComponentKind::Submit, "Go", || {
                Ok(LayoutDetail::Submit)
            })
            .unwrap();
        let nodes = registry.finish_layout();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].label, "Go");
    }

    #[test]
    fn test_reset_restarts_counter() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Phase::Layout, ComponentKind::Text, "a", text)
            .unwrap();
        registry.reset();
        let id = registry
            .register(Phase::Layout, ComponentKind::Text, "b", text)
            .unwrap();
        assert_eq!(id.as_str(), "component_0");
    }
}
