//! Directive vocabulary and pruning passes.
//!
//! Directives are plain attributes on template nodes. Every pass strips
//! the markers it consumes, so a fully assembled document carries no
//! directive attributes for the passes that ran.

use std::sync::LazyLock;

use regex::Regex;

use crate::data::{FieldMap, FieldStore, FieldValue};
use crate::dom::{Document, NodeId};
use crate::log;

// ============================================================================
// Vocabulary
// ============================================================================

/// Tag whose content stays inert until cloned by the assembler.
pub const TEMPLATE_TAG: &str = "template";
/// Unconditional removal marker.
pub const OBSOLETE_ATTR: &str = "data-b-obsolete";
/// Conditional marker; value is a field name, `!`-prefixed to negate.
pub const CONDITION_ATTR: &str = "data-b-if";
/// Text slot marker (scalar field) or repeater slot marker (array field).
pub const SLOT_ATTR: &str = "data-slot";
/// Sub-template name, on repeater slots and widget nodes.
pub const TEMPLATE_ATTR: &str = "data-template";
/// Link attribute substitution target.
pub const HREF_ATTR: &str = "data-attr-href";
/// Resource attribute substitution target.
pub const SRC_ATTR: &str = "data-attr-src";
/// Section marker; value names a source section to clone and populate.
pub const SECTION_ATTR: &str = "data-section";
/// Widget marker; value is a widget instance id.
pub const WIDGET_ATTR: &str = "data-widget";
/// Markup definition inside a section node; value is a widget type.
pub const MARKUP_ATTR: &str = "data-markup";
/// List-widget constraint: comma-separated label names to keep.
pub const FILTER_LABELS_ATTR: &str = "data-filter-labels";
/// List-widget constraint: item cap.
pub const MAX_POSTS_ATTR: &str = "data-max-posts";

/// Negation sigil for conditional field names.
const NEGATION: char = '!';

/// Derive a widget's type from its instance id: the leading alphabetic
/// run (`BlogPost1` -> `BlogPost`). `None` when the id starts with
/// anything else.
pub fn widget_type(instance_id: &str) -> Option<&str> {
    static RE_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+").unwrap());
    RE_TYPE.find(instance_id).map(|m| m.as_str())
}

// ============================================================================
// Pruning passes
// ============================================================================

/// Remove every obsolete-marked subtree under `scope`. Idempotent.
pub fn strip_obsoletes(doc: &mut Document, scope: NodeId) {
    for node in doc.elements_with_attr(scope, OBSOLETE_ATTR) {
        doc.detach(node);
    }
}

/// Evaluate every conditional marker under `scope` against `data`,
/// removing subtrees whose condition fails. The marker is stripped
/// whether or not its subtree survives.
pub fn apply_conditionals(
    doc: &mut Document,
    scope: NodeId,
    source: &Document,
    store: &FieldStore,
    data: &FieldMap,
) {
    for node in doc.elements_with_attr(scope, CONDITION_ATTR) {
        let Some(raw) = doc.attr(node, CONDITION_ATTR).map(str::to_string) else {
            continue;
        };
        let (negated, key) = match raw.strip_prefix(NEGATION) {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };

        let met = evaluate(source, store, data, key) != negated;

        doc.remove_attr(node, CONDITION_ATTR);
        if !met {
            doc.detach(node);
        }
    }
}

/// Resolve a named field to a truth value.
///
/// Missing fields and repeated groups are false. A handle flagged boolean
/// parses its trimmed literal content; any other handle is true when its
/// trimmed text is non-empty.
fn evaluate(source: &Document, store: &FieldStore, data: &FieldMap, key: &str) -> bool {
    match data.get(key) {
        None => false,
        Some(FieldValue::Items(_)) => {
            log!("widget"; "conditional `{key}` names a repeated group, treating as false");
            false
        }
        Some(FieldValue::Handle(handle)) => {
            let Some(field) = store.get(*handle) else {
                return false;
            };
            let text = source.text_content(field.node);
            let text = text.trim();
            if field.boolean {
                serde_json::from_str::<bool>(text).unwrap_or_else(|_| {
                    log!("error"; "field `{key}` is not a boolean literal: `{text}`");
                    false
                })
            } else {
                !text.is_empty()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::extract;

    /// Extract a field map from island fields, returning everything a
    /// conditional pass needs.
    fn fields(island_fields: &str) -> (Document, FieldStore, FieldMap) {
        let markup = format!(
            r#"<body><template class="WidgetData" id="W"><div>{island_fields}</div></template></body>"#
        );
        let doc = Document::parse(markup.as_bytes()).unwrap();
        let mut store = FieldStore::new();
        let mut records = extract(&doc, &mut store);
        let data = records.remove(0).data;
        (doc, store, data)
    }

    fn prune(template: &str, source: &Document, store: &FieldStore, data: &FieldMap) -> String {
        let mut work = Document::parse(template.as_bytes()).unwrap();
        let root = work.root();
        apply_conditionals(&mut work, root, source, store, data);
        String::from_utf8(work.serialize().unwrap()).unwrap()
    }

    // ------------------------------------------------------------------------
    // widget_type
    // ------------------------------------------------------------------------

    #[test]
    fn test_widget_type_takes_alphabetic_prefix() {
        assert_eq!(widget_type("BlogPost1"), Some("BlogPost"));
        assert_eq!(widget_type("Blog2"), Some("Blog"));
        assert_eq!(widget_type("Nav"), Some("Nav"));
    }

    #[test]
    fn test_widget_type_requires_leading_letter() {
        assert_eq!(widget_type("1Blog"), None);
        assert_eq!(widget_type(""), None);
    }

    // ------------------------------------------------------------------------
    // strip_obsoletes
    // ------------------------------------------------------------------------

    #[test]
    fn test_strip_obsoletes_removes_marked_subtrees() {
        let mut doc =
            Document::parse(b"<div><p data-b-obsolete=\"\">old</p><p>kept</p></div>").unwrap();
        let root = doc.root();
        strip_obsoletes(&mut doc, root);
        let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
        assert_eq!(out, "<div><p>kept</p></div>");
    }

    #[test]
    fn test_strip_obsoletes_idempotent() {
        let mut doc = Document::parse(b"<div><p data-b-obsolete=\"\">old</p></div>").unwrap();
        let root = doc.root();
        strip_obsoletes(&mut doc, root);
        let first = doc.serialize().unwrap();
        strip_obsoletes(&mut doc, root);
        assert_eq!(doc.serialize().unwrap(), first);
    }

    // ------------------------------------------------------------------------
    // apply_conditionals
    // ------------------------------------------------------------------------

    #[test]
    fn test_conditional_boolean_true_keeps_subtree() {
        let (doc, store, data) = fields(r#"<data slot="flag" data-type="boolean">true</data>"#);
        let out = prune(r#"<div><p data-b-if="flag">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div><p>x</p></div>");
    }

    #[test]
    fn test_conditional_boolean_false_removes_subtree() {
        let (doc, store, data) = fields(r#"<data slot="flag" data-type="boolean">false</data>"#);
        let out = prune(r#"<div><p data-b-if="flag">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div/>");
    }

    #[test]
    fn test_conditional_negation_inverts() {
        let (doc, store, data) = fields(r#"<data slot="flag" data-type="boolean">false</data>"#);
        let out = prune(r#"<div><p data-b-if="!flag">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div><p>x</p></div>");
    }

    #[test]
    fn test_conditional_text_field_tests_non_empty() {
        let (doc, store, data) = fields(
            r#"<data slot="filled">hello</data><data slot="blank">   </data>"#,
        );
        let out = prune(
            r#"<div><p data-b-if="filled">a</p><p data-b-if="blank">b</p></div>"#,
            &doc,
            &store,
            &data,
        );
        assert_eq!(out, "<div><p>a</p></div>");
    }

    #[test]
    fn test_conditional_missing_field_is_false() {
        let (doc, store, data) = fields("");
        let out = prune(r#"<div><p data-b-if="nope">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div/>");
        // negated missing field is true
        let out = prune(r#"<div><p data-b-if="!nope">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div><p>x</p></div>");
    }

    #[test]
    fn test_conditional_malformed_boolean_is_false() {
        let (doc, store, data) = fields(r#"<data slot="flag" data-type="boolean">yes</data>"#);
        let out = prune(r#"<div><p data-b-if="flag">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div/>");
    }

    #[test]
    fn test_conditional_repeated_group_is_false() {
        let (doc, store, data) = fields(r#"<data slot="items[]"><div></div></data>"#);
        let out = prune(r#"<div><p data-b-if="items">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, "<div/>");
    }

    #[test]
    fn test_conditional_marker_stripped_from_survivor() {
        let (doc, store, data) = fields(r#"<data slot="flag">on</data>"#);
        let out = prune(r#"<div><p data-b-if="flag" class="k">x</p></div>"#, &doc, &store, &data);
        assert_eq!(out, r#"<div><p class="k">x</p></div>"#);
    }

    #[test]
    fn test_conditional_skips_template_content() {
        let (doc, store, data) = fields("");
        let out = prune(
            r#"<div><template id="T"><p data-b-if="nope">x</p></template></div>"#,
            &doc,
            &store,
            &data,
        );
        // Inert content untouched: the marker survives for assembly time
        assert_eq!(
            out,
            r#"<div><template id="T"><p data-b-if="nope">x</p></template></div>"#
        );
    }
}
