//! Append-only field store.
//!
//! Extraction registers every scalar field node here and hands back a
//! sequential [`FieldHandle`]. Resolution is deferred: the store keeps the
//! node handle plus the declared type, and the assembler reads text or
//! clones content only at substitution time. That is what lets a slot
//! receive rich sub-content instead of a prematurely serialized string.
//!
//! One store lives for exactly one build pass and is never shared across
//! builds.

use serde::Serialize;

use crate::dom::NodeId;

/// Sequential reference to one registered field source.
///
/// Handle `i` is always the `i`-th field discovered in the build; handles
/// are never reused or reassigned. Serializes as its bare index, which is
/// the shape authors see when inspecting widget data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldHandle(usize);

/// One registered field: where its content lives and whether the source
/// declared it boolean.
#[derive(Debug, Clone, Copy)]
pub struct FieldSource {
    pub node: NodeId,
    pub boolean: bool,
}

/// Append-only table of field sources.
#[derive(Default)]
pub struct FieldStore {
    fields: Vec<FieldSource>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field node, returning the next sequential handle.
    pub fn register(&mut self, node: NodeId, boolean: bool) -> FieldHandle {
        let handle = FieldHandle(self.fields.len());
        self.fields.push(FieldSource { node, boolean });
        handle
    }

    /// Resolve a handle. `None` only for a handle minted by another build.
    pub fn get(&self, handle: FieldHandle) -> Option<FieldSource> {
        self.fields.get(handle.0).copied()
    }

    /// Number of registered field sources.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the store has any registrations.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_handles_are_sequential() {
        let mut doc = Document::new();
        let mut store = FieldStore::new();
        let a = doc.create_element("data");
        let b = doc.create_element("data");

        let h0 = store.register(a, false);
        let h1 = store.register(b, true);

        assert_eq!(serde_json::to_string(&h0).unwrap(), "0");
        assert_eq!(serde_json::to_string(&h1).unwrap(), "1");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_resolves_registered_source() {
        let mut doc = Document::new();
        let mut store = FieldStore::new();
        let node = doc.create_element("data");

        let handle = store.register(node, true);
        let source = store.get(handle).unwrap();
        assert_eq!(source.node, node);
        assert!(source.boolean);
    }

    #[test]
    fn test_foreign_handle_misses() {
        let mut doc = Document::new();
        let mut other = FieldStore::new();
        let node = doc.create_element("data");
        let foreign = other.register(node, false);

        let store = FieldStore::new();
        assert!(store.get(foreign).is_none());
        assert!(store.is_empty());
    }
}
