//! Data island extraction.
//!
//! Authors serialize per-widget field values as small markup islands in
//! the source document. Extraction walks every island, builds one
//! [`WidgetRecord`] per distinct id, and registers scalar field nodes in
//! the [`FieldStore`] in discovery order.

use crate::dom::{Document, NodeId};

use super::store::FieldStore;
use super::types::{FieldMap, FieldValue, WidgetRecord};

/// Class marking a data island element.
const ISLAND_CLASS: &str = "WidgetData";
/// Field element tag inside an island.
const FIELD_TAG: &str = "data";
/// Attribute carrying a field's name.
const FIELD_NAME_ATTR: &str = "slot";
/// Attribute declaring a field's primitive type.
const FIELD_TYPE_ATTR: &str = "data-type";
/// The only recognized declared type.
const BOOLEAN_TYPE: &str = "boolean";
/// Field-name suffix marking a repeated group.
const REPEAT_SUFFIX: &str = "[]";
/// Tag wrapping one item of a repeated group.
const GROUP_ITEM_TAG: &str = "div";
/// Field name read once per island as the record title.
const TITLE_SLOT: &str = "title";

/// Walk every data island in `source` and build widget records,
/// registering scalar fields in `store` as they are discovered.
///
/// Islands carrying the same id merge their fields into the record
/// created first. An island without a content element still yields its
/// record shell; field reading is skipped for it.
pub fn extract(source: &Document, store: &mut FieldStore) -> Vec<WidgetRecord> {
    let mut records: Vec<WidgetRecord> = Vec::new();

    for island in source.elements_with_class(source.root(), ISLAND_CLASS) {
        let id = source.attr(island, "id").unwrap_or_default().to_string();

        let idx = match records.iter().position(|r| r.id == id) {
            Some(idx) => idx,
            None => {
                records.push(WidgetRecord {
                    id,
                    title: read_title(source, island),
                    section_id: section_of(source, island),
                    data: FieldMap::new(),
                });
                records.len() - 1
            }
        };

        // Fields hang off the island's first content element
        if let Some(content) = source.child_elements(island).first().copied() {
            read_fields(source, store, content, &mut records[idx].data);
        }
    }

    records
}

/// Trimmed text of the island's title slot, when one exists.
fn read_title(source: &Document, island: NodeId) -> Option<String> {
    source
        .elements_with_attr_value(island, FIELD_NAME_ATTR, TITLE_SLOT)
        .first()
        .map(|&node| source.text_content(node).trim().to_string())
}

/// Section association: the id of the island's grandparent element.
fn section_of(source: &Document, island: NodeId) -> Option<String> {
    let grandparent = source.parent(island).and_then(|p| source.parent(p))?;
    source.attr(grandparent, "id").map(str::to_string)
}

/// Read every direct child field of `node` into `data`.
fn read_fields(source: &Document, store: &mut FieldStore, node: NodeId, data: &mut FieldMap) {
    for field in source.child_elements(node) {
        if source.tag_name(field) == Some(FIELD_TAG) {
            read_field(source, store, field, data);
        }
    }
}

/// Read one field element: either a repeated group or a scalar handle.
fn read_field(source: &Document, store: &mut FieldStore, field: NodeId, data: &mut FieldMap) {
    let name = source.attr(field, FIELD_NAME_ATTR).unwrap_or_default();

    if let Some(base) = name.strip_suffix(REPEAT_SUFFIX) {
        // One array item per direct group wrapper, in source order
        let mut items = Vec::new();
        for group in source.child_elements(field) {
            if source.tag_name(group) == Some(GROUP_ITEM_TAG) {
                let mut item = FieldMap::new();
                read_fields(source, store, group, &mut item);
                items.push(item);
            }
        }
        data.insert(base.to_string(), FieldValue::Items(items));
    } else {
        let boolean = source.attr(field, FIELD_TYPE_ATTR) == Some(BOOLEAN_TYPE);
        let handle = store.register(field, boolean);
        data.insert(name.to_string(), FieldValue::Handle(handle));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<body><div id="main"><div>
        <template class="WidgetData" id="BlogPost1"><div>
            <data slot="title"> Hello </data>
            <data slot="visible" data-type="boolean">true</data>
            <data slot="posts[]">
                <div>
                    <data slot="name">First</data>
                    <data slot="labels[]"><div><data slot="name">A</data></div></data>
                </div>
                <div><data slot="name">Second</data></div>
            </data>
        </div></template>
    </div></div></body>"#;

    fn run(markup: &str) -> (Vec<WidgetRecord>, FieldStore, Document) {
        let doc = Document::parse(markup.as_bytes()).unwrap();
        let mut store = FieldStore::new();
        let records = extract(&doc, &mut store);
        (records, store, doc)
    }

    #[test]
    fn test_extract_record_shell() {
        let (records, _, _) = run(PAGE);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "BlogPost1");
        assert_eq!(record.title.as_deref(), Some("Hello"));
        assert_eq!(record.section_id.as_deref(), Some("main"));
    }

    #[test]
    fn test_extract_field_tree_shape() {
        let (records, store, _) = run(PAGE);
        let json = serde_json::to_string(&records[0].data).unwrap();
        // Handles numbered in discovery order, nested groups recursed
        assert_eq!(
            json,
            r#"{"title":0,"visible":1,"posts":[{"name":2,"labels":[{"name":3}]},{"name":4}]}"#
        );
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_extract_records_declared_boolean() {
        let (records, store, _) = run(PAGE);
        let FieldValue::Handle(title) = records[0].data["title"] else {
            panic!("title should be scalar");
        };
        let FieldValue::Handle(visible) = records[0].data["visible"] else {
            panic!("visible should be scalar");
        };
        // Boolean fields still get plain handles; only the flag differs
        assert!(!store.get(title).unwrap().boolean);
        assert!(store.get(visible).unwrap().boolean);
    }

    #[test]
    fn test_extract_merges_repeated_island_ids() {
        let markup = r#"<body>
            <template class="WidgetData" id="W"><div>
                <data slot="a">1</data><data slot="b">2</data>
            </div></template>
            <template class="WidgetData" id="W"><div>
                <data slot="b">3</data><data slot="c">4</data>
            </div></template>
        </body>"#;
        let (records, _, _) = run(markup);
        assert_eq!(records.len(), 1);
        let json = serde_json::to_string(&records[0].data).unwrap();
        // b overwritten by the later island, position kept
        assert_eq!(json, r#"{"a":0,"b":2,"c":3}"#);
    }

    #[test]
    fn test_extract_skips_islands_inside_template_content() {
        let markup = r#"<body>
            <template id="wrapper">
                <template class="WidgetData" id="Hidden"><div>
                    <data slot="a">1</data>
                </div></template>
            </template>
            <template class="WidgetData" id="Seen"><div></div></template>
        </body>"#;
        let (records, _, _) = run(markup);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "Seen");
    }

    #[test]
    fn test_extract_island_without_content_element() {
        let markup = r#"<body><template class="WidgetData" id="Empty"></template></body>"#;
        let (records, store, _) = run(markup);
        assert_eq!(records.len(), 1);
        assert!(records[0].data.is_empty());
        assert_eq!(records[0].title, None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_extract_ignores_non_field_children() {
        let markup = r#"<body><template class="WidgetData" id="W"><div>
            <span>ignored</span>
            <data slot="kept">x</data>
            <data slot="list[]"><span>not a group</span><div></div></data>
        </div></template></body>"#;
        let (records, _, _) = run(markup);
        let json = serde_json::to_string(&records[0].data).unwrap();
        assert_eq!(json, r#"{"kept":0,"list":[{}]}"#);
    }

    #[test]
    fn test_extract_island_without_id() {
        let markup = r#"<body><template class="WidgetData"><div>
            <data slot="a">1</data>
        </div></template></body>"#;
        let (records, _, _) = run(markup);
        assert_eq!(records[0].id, "");
    }
}
