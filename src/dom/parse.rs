//! Byte stream to [`Document`] conversion.

use anyhow::Result;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

use super::node::{Document, NodeId};

impl Document {
    /// Parse markup into a document tree.
    ///
    /// The reader runs with name checks relaxed: an end tag that does not
    /// match the open element is dropped instead of rejected. Entity
    /// references are kept as literal `&name;` text and attribute values
    /// keep their wire form, so unknown entities survive a round trip.
    /// Processing instructions and XML declarations do not participate in
    /// assembly and are skipped.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(content);
        reader.config_mut().trim_text(false);
        reader.config_mut().enable_all_checks(false);
        // enable_all_checks leaves this at false; without it a stray end
        // tag aborts the read instead of reaching the closes_open match.
        reader.config_mut().allow_unmatched_ends = true;

        let mut doc = Document::new();
        let root = doc.root();
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let parent = stack.last().copied().unwrap_or(root);
            match reader.read_event() {
                Ok(Event::Start(elem)) => {
                    let id = convert_element(&mut doc, &elem);
                    doc.append_child(parent, id);
                    stack.push(id);
                }
                Ok(Event::Empty(elem)) => {
                    let id = convert_element(&mut doc, &elem);
                    doc.append_child(parent, id);
                }
                Ok(Event::End(elem)) => {
                    // Only a matching end tag closes the open element
                    let closes_open = stack.last().is_some_and(|&open| {
                        doc.tag_name(open).map(str::as_bytes) == Some(elem.name().as_ref())
                    });
                    if closes_open {
                        stack.pop();
                    }
                }
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let id = doc.create_text_escaped(raw);
                    doc.append_child(parent, id);
                }
                Ok(Event::GeneralRef(e)) => {
                    // References arrive as their own events; keep them
                    // literal so &nbsp; and friends round-trip untouched.
                    let name = e.decode()?;
                    let id = doc.create_text_escaped(format!("&{name};"));
                    doc.append_child(parent, id);
                }
                Ok(Event::CData(e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let escaped = quick_xml::escape::escape(&raw).into_owned();
                    let id = doc.create_text_escaped(escaped);
                    doc.append_child(parent, id);
                }
                Ok(Event::Comment(e)) => {
                    let body = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let id = doc.create_comment(body);
                    doc.append_child(parent, id);
                }
                Ok(Event::DocType(e)) => {
                    let body = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let id = doc.create_doctype(body);
                    doc.append_child(parent, id);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => anyhow::bail!(
                    "markup parse error at position {}: {:?}",
                    reader.error_position(),
                    e
                ),
            }
        }

        Ok(doc)
    }
}

fn convert_element(doc: &mut Document, elem: &BytesStart<'_>) -> NodeId {
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in elem.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        // Values keep their wire form; the writer emits them verbatim
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        attrs.push((key, value));
    }
    doc.create_element_with_attrs(name, attrs)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = Document::parse(b"<div id=\"a\"><p>hi</p><span/></div>").unwrap();
        let div = doc.element_by_id(doc.root(), "a").unwrap();
        assert_eq!(doc.tag_name(div), Some("div"));
        let children = doc.child_elements(div);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag_name(children[0]), Some("p"));
        assert_eq!(doc.tag_name(children[1]), Some("span"));
        assert_eq!(doc.text_content(children[0]), "hi");
    }

    #[test]
    fn test_parse_keeps_attribute_wire_form() {
        let doc = Document::parse(br#"<a title="a &amp; b &lt;c&gt;"/>"#).unwrap();
        let a = doc.child_elements(doc.root())[0];
        assert_eq!(doc.attr(a, "title"), Some("a &amp; b &lt;c&gt;"));
    }

    #[test]
    fn test_parse_text_entities_resolve_on_access() {
        let doc = Document::parse(b"<p>a &amp; b</p>").unwrap();
        let p = doc.child_elements(doc.root())[0];
        assert_eq!(doc.text_content(p), "a & b");
        // Stored as three nodes: "a ", the reference, " b"
        assert_eq!(doc.children(p).len(), 3);
    }

    #[test]
    fn test_parse_unknown_entity_stays_literal() {
        let doc = Document::parse(b"<p>a&nbsp;b</p>").unwrap();
        let p = doc.child_elements(doc.root())[0];
        // No resolution for references the writer must reproduce
        assert_eq!(doc.text_content(p), "a&nbsp;b");
    }

    #[test]
    fn test_parse_numeric_reference() {
        let doc = Document::parse(b"<p>&#169;</p>").unwrap();
        let p = doc.child_elements(doc.root())[0];
        assert_eq!(doc.text_content(p), "\u{a9}");
    }

    #[test]
    fn test_parse_multiple_top_level_nodes() {
        let doc = Document::parse(b"<!DOCTYPE html><html><body/></html>").unwrap();
        assert_eq!(doc.children(doc.root()).len(), 2);
        let html = doc.child_elements(doc.root())[0];
        assert_eq!(doc.tag_name(html), Some("html"));
    }

    #[test]
    fn test_parse_comment() {
        let doc = Document::parse(b"<div><!-- note --></div>").unwrap();
        let div = doc.child_elements(doc.root())[0];
        assert_eq!(doc.children(div).len(), 1);
        assert!(doc.child_elements(div).is_empty());
    }

    #[test]
    fn test_parse_cdata_becomes_text() {
        let doc = Document::parse(b"<p><![CDATA[a < b]]></p>").unwrap();
        let p = doc.child_elements(doc.root())[0];
        assert_eq!(doc.text_content(p), "a < b");
    }

    #[test]
    fn test_parse_preserves_whitespace_text() {
        let doc = Document::parse(b"<div>\n  <p/>\n</div>").unwrap();
        let div = doc.child_elements(doc.root())[0];
        assert_eq!(doc.children(div).len(), 3);
        assert_eq!(doc.text_content(div), "\n  \n");
    }

    #[test]
    fn test_parse_stray_end_tag_tolerated() {
        let doc = Document::parse(b"<div><p>hi</p></b></div>").unwrap();
        let div = doc.child_elements(doc.root())[0];
        assert_eq!(doc.text_content(div), "hi");
    }

    #[test]
    fn test_parse_stray_end_tag_keeps_nesting() {
        // The stray </b> must not close <div> and push <span> to the top
        let doc = Document::parse(b"<div><p>hi</p></b><span/></div>").unwrap();
        assert_eq!(doc.children(doc.root()).len(), 1);
        let div = doc.child_elements(doc.root())[0];
        let children = doc.child_elements(div);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag_name(children[0]), Some("p"));
        assert_eq!(doc.tag_name(children[1]), Some("span"));
    }
}
