//! Node arena, tree surgery and element queries.

use quick_xml::escape::{escape, unescape};

// ============================================================================
// Handles and Node Kinds
// ============================================================================

/// Stable handle into a [`Document`] arena.
///
/// Stays valid for the lifetime of its document. Handles are meaningless
/// across documents; importing a subtree yields fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What a node in the tree is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Synthetic container at the top of every document.
    Document,
    /// Element with tag name and wire-form attributes, in source order.
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    /// Character data in escaped form, exactly as read.
    Text(String),
    /// Comment body without the `<!--` `-->` delimiters.
    Comment(String),
    /// Doctype body without the `<!DOCTYPE` `>` delimiters.
    Doctype(String),
}

struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A markup tree backed by a flat node arena.
///
/// Node slots are append-only: [`Document::detach`] unlinks, it never frees.
pub struct Document {
    nodes: Vec<Node>,
}

// ============================================================================
// Construction
// ============================================================================

impl Document {
    /// Create an empty document containing only the synthetic root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The synthetic root holding all top-level nodes.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element with no attributes.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_string(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached fragment container. A fragment never reaches
    /// serialized output itself; only its children get spliced somewhere.
    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Document)
    }

    pub(crate) fn create_element_with_attrs(
        &mut self,
        name: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.alloc(NodeKind::Element { name, attrs })
    }

    /// Create a detached text node. The text is escaped for storage.
    #[cfg(test)]
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let escaped = escape(text).into_owned();
        self.alloc(NodeKind::Text(escaped))
    }

    /// Create a detached text node from already-escaped content.
    pub(crate) fn create_text_escaped(&mut self, escaped: String) -> NodeId {
        self.alloc(NodeKind::Text(escaped))
    }

    pub(crate) fn create_comment(&mut self, body: String) -> NodeId {
        self.alloc(NodeKind::Comment(body))
    }

    pub(crate) fn create_doctype(&mut self, body: String) -> NodeId {
        self.alloc(NodeKind::Doctype(body))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Structure Access
// ============================================================================

impl Document {
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children only, skipping text and comments.
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Stored value of an attribute, if the node is an element carrying
    /// it. Values read back in wire form, exactly as serialized.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set or replace an attribute, escaping the value for storage.
    /// No-op on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let escaped = escape(value).into_owned();
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            if let Some(entry) = attrs.iter_mut().find(|(k, _)| k == name) {
                entry.1 = escaped;
            } else {
                attrs.push((name.to_string(), escaped));
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.retain(|(k, _)| k != name);
        }
    }

    /// Whether the element's `class` attribute contains `class` as one of
    /// its space-separated entries.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Concatenated, unescaped text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let NodeKind::Text(escaped) = &self.nodes[current.0].kind {
                match unescape(escaped) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(escaped),
                }
            }
            for &child in self.nodes[current.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

// ============================================================================
// Tree Surgery
// ============================================================================

impl Document {
    /// Append `child` as the last child of `parent`, moving it from its
    /// current position if attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `new` as the previous sibling of `reference`.
    ///
    /// Leaves `new` detached when `reference` has no parent.
    pub fn insert_before(&mut self, new: NodeId, reference: NodeId) {
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        self.detach(new);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(pos, new);
        self.nodes[new.0].parent = Some(parent);
    }

    /// Unlink a node from its parent. The node and its subtree stay in the
    /// arena, so existing handles into it keep working.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Detach all children of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep-copy a subtree within this document. Returns the detached copy.
    pub fn clone_subtree(&mut self, src: NodeId) -> NodeId {
        let kind = self.nodes[src.0].kind.clone();
        let children = self.nodes[src.0].children.clone();
        let copy = self.alloc(kind);
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Deep-copy a subtree from another document into this one.
    /// Returns the detached copy; `source` is left untouched.
    pub fn import_subtree(&mut self, source: &Document, src: NodeId) -> NodeId {
        let copy = self.alloc(source.nodes[src.0].kind.clone());
        for &child in &source.nodes[src.0].children {
            let child_copy = self.import_subtree(source, child);
            self.append_child(copy, child_copy);
        }
        copy
    }
}

// ============================================================================
// Queries
// ============================================================================
//
// All queries walk descendants of `scope` in document order, excluding
// `scope` itself, and return a snapshot that survives later mutation.
//
// Template element content is inert: queries yield `template` elements but
// never descend into them, matching the runtime the directive vocabulary
// targets. Content becomes queryable once cloned out. A `scope` that is
// itself a template IS entered; that is how declaration sweeps work.

/// Elements whose content stays hidden from queries.
const INERT_TAG: &str = "template";

impl Document {
    fn elements_matching(&self, scope: NodeId, pred: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope.0].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            let inert = match &self.nodes[current.0].kind {
                NodeKind::Element { name, .. } => {
                    if pred(current) {
                        out.push(current);
                    }
                    name == INERT_TAG
                }
                _ => false,
            };
            if !inert {
                for &child in self.nodes[current.0].children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.elements_matching(scope, |id| self.tag_name(id) == Some(tag))
    }

    pub fn elements_with_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.elements_matching(scope, |id| self.has_class(id, class))
    }

    pub fn elements_with_attr(&self, scope: NodeId, attr: &str) -> Vec<NodeId> {
        self.elements_matching(scope, |id| self.has_attr(id, attr))
    }

    pub fn elements_with_attr_value(&self, scope: NodeId, attr: &str, value: &str) -> Vec<NodeId> {
        self.elements_matching(scope, |id| self.attr(id, attr) == Some(value))
    }

    /// First element under `scope` whose `id` attribute equals `id`.
    pub fn element_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.elements_matching(scope, |n| self.attr(n, "id") == Some(id))
            .into_iter()
            .next()
    }
}

// ============================================================================
// Tests
// ============================================================================
