//! Widget assembly against extracted records.
//!
//! ```text
//!                 +-------------------+
//!   records ----> |   fill_widgets    | ----> assembled working template
//!                 +-------------------+
//!                   |       |       |
//!            obsoletes  sections  widgets
//!            + conds       |       |
//!                          +--> build() per placeholder
//! ```
//!
//! `build` is the single instantiation primitive: it clones a template's
//! content, prunes it, and substitutes every field of one record. Repeater
//! slots recurse through it, one call per item. A resolution miss never
//! aborts the pass; the affected node degrades to empty output or stays
//! as authored.

use crate::data::{
    merge_global, FieldHandle, FieldMap, FieldStore, FieldValue, WidgetRecord, GLOBAL_RECORD_ID,
};
use crate::dom::{Document, NodeId};
use crate::log;

use super::directives::{
    apply_conditionals, strip_obsoletes, widget_type, FILTER_LABELS_ATTR, HREF_ATTR, MARKUP_ATTR,
    MAX_POSTS_ATTR, SECTION_ATTR, SLOT_ATTR, SRC_ATTR, TEMPLATE_ATTR, TEMPLATE_TAG, WIDGET_ATTR,
};

/// Widget type whose item collection honors placement constraints.
const LIST_WIDGET_TYPE: &str = "Blog";
/// Item collection field of a list widget.
const POSTS_FIELD: &str = "posts";
/// Label group field of one list item.
const LABELS_FIELD: &str = "labels";
/// Name field of one label.
const LABEL_NAME_FIELD: &str = "name";
/// Class naming a section in the data document.
const SECTION_CLASS: &str = "section";
/// Class marking first-level widget placeholders inside a section.
const PLACEHOLDER_CLASS: &str = "widget";

// ============================================================================
// Context
// ============================================================================

/// Everything one assembly pass needs, threaded through every call.
pub struct AssemblyContext<'a> {
    /// Document being assembled, mutated in place.
    pub work: &'a mut Document,
    /// Root of the working template within `work`.
    pub template_root: NodeId,
    /// Document the field handles and section sources point into.
    pub source: &'a Document,
    /// Field sources registered during extraction.
    pub store: &'a FieldStore,
    /// Fields of the global record, filled in by [`fill_widgets`].
    pub global: FieldMap,
}

/// How the assembler finds the template to instantiate.
pub enum TemplateTarget {
    /// First element carrying this id.
    ById(String),
    /// First template element carrying this id.
    TemplateById(String),
}

fn resolve_target(ctx: &AssemblyContext, target: &TemplateTarget) -> Option<NodeId> {
    match target {
        TemplateTarget::ById(id) => ctx.work.element_by_id(ctx.template_root, id),
        TemplateTarget::TemplateById(id) => ctx
            .work
            .elements_by_tag(ctx.template_root, TEMPLATE_TAG)
            .into_iter()
            .find(|&t| ctx.work.attr(t, "id") == Some(id.as_str())),
    }
}

// ============================================================================
// Single-widget build
// ============================================================================

/// Assemble one widget: clone the target template's content and resolve
/// every directive in it against `data`.
///
/// Returns a detached fragment in the working document; an unresolvable
/// target yields an empty fragment.
pub fn build(ctx: &mut AssemblyContext, target: &TemplateTarget, data: &FieldMap) -> NodeId {
    let fragment = ctx.work.create_fragment();

    let Some(template) = resolve_target(ctx, target) else {
        return fragment;
    };

    // Template elements contribute their content, anything else clones whole
    if ctx.work.tag_name(template) == Some(TEMPLATE_TAG) {
        for child in ctx.work.children(template).to_vec() {
            let copy = ctx.work.clone_subtree(child);
            ctx.work.append_child(fragment, copy);
        }
    } else {
        let copy = ctx.work.clone_subtree(template);
        ctx.work.append_child(fragment, copy);
    }

    strip_obsoletes(ctx.work, fragment);
    apply_conditionals(ctx.work, fragment, ctx.source, ctx.store, data);

    for (key, value) in data {
        match value {
            FieldValue::Items(items) => substitute_repeater(ctx, fragment, key, items),
            FieldValue::Handle(handle) => substitute_scalar(ctx, fragment, key, *handle),
        }
    }

    fragment
}

/// Instantiate a named sub-template once per item, splicing the results
/// into each matching repeater slot in item order.
fn substitute_repeater(ctx: &mut AssemblyContext, fragment: NodeId, key: &str, items: &[FieldMap]) {
    for slot in ctx.work.elements_with_attr_value(fragment, SLOT_ATTR, key) {
        let template_id = ctx
            .work
            .attr(slot, TEMPLATE_ATTR)
            .unwrap_or_default()
            .to_string();
        let target = TemplateTarget::ById(template_id);

        let assembled = ctx.work.create_fragment();
        for item in items {
            let merged = merge_global(item, &ctx.global);
            let built = build(ctx, &target, &merged);
            for child in ctx.work.children(built).to_vec() {
                ctx.work.append_child(assembled, child);
            }
        }

        ctx.work.clear_children(slot);
        for child in ctx.work.children(assembled).to_vec() {
            ctx.work.append_child(slot, child);
        }
        ctx.work.remove_attr(slot, SLOT_ATTR);
        ctx.work.remove_attr(slot, TEMPLATE_ATTR);
    }
}

/// Resolve a handle and run the three scalar substitution passes for
/// `key`: link attributes, resource attributes, then content slots.
fn substitute_scalar(ctx: &mut AssemblyContext, fragment: NodeId, key: &str, handle: FieldHandle) {
    let Some(field) = ctx.store.get(handle) else {
        return;
    };
    let text = ctx.source.text_content(field.node).trim().to_string();

    for node in ctx.work.elements_with_attr_value(fragment, HREF_ATTR, key) {
        ctx.work.set_attr(node, "href", &text);
        ctx.work.remove_attr(node, HREF_ATTR);
    }
    for node in ctx.work.elements_with_attr_value(fragment, SRC_ATTR, key) {
        ctx.work.set_attr(node, "src", &text);
        ctx.work.remove_attr(node, SRC_ATTR);
    }
    // Slots take the field's children wholesale so inline markup survives
    for slot in ctx.work.elements_with_attr_value(fragment, SLOT_ATTR, key) {
        ctx.work.clear_children(slot);
        for child in ctx.source.children(field.node).to_vec() {
            let copy = ctx.work.import_subtree(ctx.source, child);
            ctx.work.append_child(slot, copy);
        }
        ctx.work.remove_attr(slot, SLOT_ATTR);
    }
}

// ============================================================================
// Template-wide fill
// ============================================================================

/// Run the assembly tail over the whole working template: prune against
/// the global record, then populate sections and standalone widgets.
pub fn fill_widgets(ctx: &mut AssemblyContext, records: &[WidgetRecord]) {
    ctx.global = records
        .iter()
        .find(|r| r.id == GLOBAL_RECORD_ID)
        .map(|r| r.data.clone())
        .unwrap_or_default();

    strip_obsoletes(ctx.work, ctx.template_root);
    apply_conditionals(ctx.work, ctx.template_root, ctx.source, ctx.store, &ctx.global);

    process_sections(ctx, records);
    process_widgets(ctx, records);
}

/// Clone each named source section into its marker node and assemble the
/// first-level widget placeholders inside the clone. The marker keeps its
/// attribute so re-exported templates stay recognizable.
fn process_sections(ctx: &mut AssemblyContext, records: &[WidgetRecord]) {
    for node in ctx.work.elements_with_attr(ctx.template_root, SECTION_ATTR) {
        let Some(section_id) = ctx.work.attr(node, SECTION_ATTR).map(str::to_string) else {
            continue;
        };
        let Some(section) = find_section(ctx.source, &section_id) else {
            log!("widget"; "no source section named `{section_id}`");
            continue;
        };

        let clone = ctx.work.import_subtree(ctx.source, section);

        for placeholder in widget_placeholders(ctx.work, clone) {
            let instance_id = ctx
                .work
                .attr(placeholder, "id")
                .unwrap_or_default()
                .to_string();
            let kind = widget_type(&instance_id).unwrap_or_default().to_string();

            // Markup definitions live inside the marker node itself
            let Some(markup) = ctx
                .work
                .elements_with_attr_value(node, MARKUP_ATTR, &kind)
                .into_iter()
                .next()
            else {
                continue;
            };
            let template_id = ctx
                .work
                .attr(markup, TEMPLATE_ATTR)
                .unwrap_or_default()
                .to_string();

            let Some(record) = records.iter().find(|r| r.id == instance_id) else {
                log!("widget"; "no record for section widget `{instance_id}`");
                continue;
            };

            let merged = merge_global(&record.data, &ctx.global);
            let built = build(ctx, &TemplateTarget::TemplateById(template_id), &merged);
            replace_children_with_fragment(ctx.work, placeholder, built);
        }

        ctx.work.clear_children(node);
        ctx.work.append_child(node, clone);
    }
}

/// Assemble every standalone widget marker against its record.
fn process_widgets(ctx: &mut AssemblyContext, records: &[WidgetRecord]) {
    for node in ctx.work.elements_with_attr(ctx.template_root, WIDGET_ATTR) {
        let instance_id = ctx
            .work
            .attr(node, WIDGET_ATTR)
            .unwrap_or_default()
            .to_string();
        let kind = widget_type(&instance_id).unwrap_or_default().to_string();
        let template_id = ctx
            .work
            .attr(node, TEMPLATE_ATTR)
            .map(str::to_string)
            .unwrap_or_else(|| kind.clone());

        let Some(record) = records.iter().find(|r| r.id == instance_id) else {
            log!("widget"; "empty widget slot: {instance_id}");
            ctx.work.remove_attr(node, WIDGET_ATTR);
            ctx.work.remove_attr(node, TEMPLATE_ATTR);
            continue;
        };

        let narrowed = if kind == LIST_WIDGET_TYPE {
            narrow_list_data(ctx, node, record)
        } else {
            None
        };
        let base = narrowed.as_ref().unwrap_or(&record.data);
        let merged = merge_global(base, &ctx.global);

        let built = build(ctx, &TemplateTarget::TemplateById(template_id), &merged);
        replace_children_with_fragment(ctx.work, node, built);
        ctx.work.remove_attr(node, WIDGET_ATTR);
        ctx.work.remove_attr(node, TEMPLATE_ATTR);
    }
}

/// List widgets can narrow their item collection per placement. Returns a
/// derived copy of the record data, or `None` when no constraint applies.
/// The stored record is never touched.
fn narrow_list_data(
    ctx: &AssemblyContext,
    node: NodeId,
    record: &WidgetRecord,
) -> Option<FieldMap> {
    let filter_labels: Option<Vec<String>> = ctx
        .work
        .attr(node, FILTER_LABELS_ATTR)
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect());
    let max_posts: i64 = ctx
        .work
        .attr(node, MAX_POSTS_ATTR)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0);

    if filter_labels.is_none() && max_posts <= 0 {
        return None;
    }
    let Some(FieldValue::Items(posts)) = record.data.get(POSTS_FIELD) else {
        return None;
    };

    let mut posts = posts.clone();
    if let Some(labels) = &filter_labels {
        posts.retain(|post| post_has_label(ctx, post, labels));
    }
    if max_posts > 0 {
        posts.truncate(max_posts as usize);
    }

    let mut data = record.data.clone();
    data.insert(POSTS_FIELD.to_string(), FieldValue::Items(posts));
    Some(data)
}

fn post_has_label(ctx: &AssemblyContext, post: &FieldMap, wanted: &[String]) -> bool {
    let Some(FieldValue::Items(labels)) = post.get(LABELS_FIELD) else {
        return false;
    };
    labels.iter().any(|label| {
        label_name(ctx, label).is_some_and(|name| wanted.iter().any(|w| *w == name))
    })
}

/// Trimmed text of a label item's name field.
fn label_name(ctx: &AssemblyContext, label: &FieldMap) -> Option<String> {
    match label.get(LABEL_NAME_FIELD)? {
        FieldValue::Handle(handle) => {
            let field = ctx.store.get(*handle)?;
            Some(ctx.source.text_content(field.node).trim().to_string())
        }
        FieldValue::Items(_) => None,
    }
}

fn find_section(source: &Document, id: &str) -> Option<NodeId> {
    source
        .elements_with_class(source.root(), SECTION_CLASS)
        .into_iter()
        .find(|&s| source.attr(s, "id") == Some(id))
}

/// Direct element children of `section` flagged as widget placeholders.
fn widget_placeholders(doc: &Document, section: NodeId) -> Vec<NodeId> {
    doc.child_elements(section)
        .into_iter()
        .filter(|&c| doc.has_class(c, PLACEHOLDER_CLASS))
        .collect()
}

fn replace_children_with_fragment(doc: &mut Document, node: NodeId, fragment: NodeId) {
    doc.clear_children(node);
    for child in doc.children(fragment).to_vec() {
        doc.append_child(node, child);
    }
}

// ============================================================================
// Tests
// ============================================================================
