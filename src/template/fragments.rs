//! Reusable fragment inlining.
//!
//! A fragment is declared once as `<template data-includable="name">` and
//! pulled into place by `<include name="name">` markers. Inlining runs
//! before any widget assembly so that declarations can carry directive
//! markup of their own.

use crate::dom::{Document, NodeId};
use crate::log;

use super::directives::TEMPLATE_TAG;

/// Fragment reference tag.
const INCLUDE_TAG: &str = "include";
/// Attribute on a reference naming the fragment to inline.
const INCLUDE_NAME_ATTR: &str = "name";
/// Attribute marking a template element as a fragment declaration.
const DECLARATION_ATTR: &str = "data-includable";

/// Nesting bound; past this a reference chain is assumed cyclic.
const MAX_DEPTH: usize = 32;

/// Inline every fragment reference under `scope`.
///
/// Two-phase sweep: references nested inside template definitions resolve
/// first, then references in the document itself. Each declaration is
/// consumed by its first reference and removed from the tree, so a name
/// substitutes at most once per pass; later references log a diagnostic
/// and their markers are dropped.
pub fn inline_fragments(doc: &mut Document, scope: NodeId) {
    for definition in doc.elements_by_tag(scope, TEMPLATE_TAG) {
        inline_into(doc, scope, definition, 0);
    }
    inline_into(doc, scope, scope, 0);
}

/// Resolve every reference under `target`, looking declarations up under
/// `scope`. Depth-first: a declaration's own references resolve before it
/// is cloned into place.
fn inline_into(doc: &mut Document, scope: NodeId, target: NodeId, depth: usize) {
    if depth > MAX_DEPTH {
        log!("fragment"; "inlining depth exceeded, assuming a reference cycle");
        return;
    }

    for reference in doc.elements_by_tag(target, INCLUDE_TAG) {
        let name = doc
            .attr(reference, INCLUDE_NAME_ATTR)
            .unwrap_or_default()
            .to_string();
        let Some(declaration) = find_declaration(doc, scope, &name) else {
            log!("fragment"; "no declaration for `{name}`, dropping the reference");
            doc.detach(reference);
            continue;
        };

        inline_into(doc, scope, declaration, depth + 1);

        for child in doc.children(declaration).to_vec() {
            let copy = doc.clone_subtree(child);
            doc.insert_before(copy, reference);
        }
        doc.detach(reference);
        doc.detach(declaration);
    }
}

fn find_declaration(doc: &Document, scope: NodeId, name: &str) -> Option<NodeId> {
    doc.elements_by_tag(scope, TEMPLATE_TAG)
        .into_iter()
        .find(|&t| doc.attr(t, DECLARATION_ATTR) == Some(name))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(markup: &str) -> String {
        let mut doc = Document::parse(markup.as_bytes()).unwrap();
        let root = doc.root();
        inline_fragments(&mut doc, root);
        String::from_utf8(doc.serialize().unwrap()).unwrap()
    }

    #[test]
    fn test_reference_replaced_by_declaration_content() {
        let out = inline(
            r#"<body><include name="nav"/><template data-includable="nav"><ul><li>Home</li></ul></template></body>"#,
        );
        assert_eq!(out, "<body><ul><li>Home</li></ul></body>");
    }

    #[test]
    fn test_multi_child_fragment_keeps_order() {
        let out = inline(
            r#"<body><include name="f"/><template data-includable="f"><a>1</a><b>2</b><c>3</c></template></body>"#,
        );
        assert_eq!(out, "<body><a>1</a><b>2</b><c>3</c></body>");
    }

    #[test]
    fn test_nested_fragment_resolves_depth_first() {
        let out = inline(
            r#"<body><include name="outer"/><template data-includable="outer"><div><include name="inner"/></div></template><template data-includable="inner"><span>deep</span></template></body>"#,
        );
        assert_eq!(out, "<body><div><span>deep</span></div></body>");
    }

    #[test]
    fn test_declaration_consumed_on_first_use() {
        let out = inline(
            r#"<body><include name="f"/><include name="f"/><template data-includable="f"><p>once</p></template></body>"#,
        );
        // second reference finds no declaration and is dropped
        assert_eq!(out, "<body><p>once</p></body>");
    }

    #[test]
    fn test_missing_declaration_drops_reference() {
        let out = inline(r#"<body><p>a</p><include name="ghost"/><p>b</p></body>"#);
        assert_eq!(out, "<body><p>a</p><p>b</p></body>");
    }

    #[test]
    fn test_references_inside_template_definitions_resolve() {
        let out = inline(
            r#"<body><template id="Widget"><include name="footer"/></template><template data-includable="footer"><small>c</small></template></body>"#,
        );
        assert_eq!(
            out,
            r#"<body><template id="Widget"><small>c</small></template></body>"#
        );
    }

    #[test]
    fn test_cyclic_reference_terminates() {
        // A references itself; the depth bound stops the recursion.
        inline(
            r#"<body><include name="a"/><template data-includable="a"><include name="a"/></template></body>"#,
        );
    }
}
