use std::collections::HashMap;

use crate::dom::dom_model::{Document, NodeId};

/// Attribute that carries an element's identity key across scans.
pub const ELEMENT_KEY_ATTR: &str = "data-autofill-key";

/// Lookup-only association from identity key to live element. Rebuilt
/// wholesale by every scan.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    entries: HashMap<String, NodeId>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn register(&mut self, key: &str, node: NodeId) {
        self.entries.insert(key.to_string(), node);
    }

    /// Whether `key` was already handed to a different element.
    pub fn is_claimed_by_other(&self, key: &str, node: NodeId) -> bool {
        self.entries.get(key).is_some_and(|owner| *owner != node)
    }

    /// Resolve a key to an element still attached to the document and
    /// still stamped with that key.
    pub fn resolve(&self, doc: &Document, key: &str) -> Option<NodeId> {
        let node = *self.entries.get(key)?;
        if !doc.is_connected(node) || doc.attr(node, ELEMENT_KEY_ATTR) != Some(key) {
            return None;
        }
        Some(node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
