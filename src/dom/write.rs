//! [`Document`] to byte stream conversion.

use anyhow::Result;
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use std::io::Cursor;

use super::node::{Document, NodeId, NodeKind};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

impl Document {
    /// Serialize the whole document.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.serialize_node(self.root())
    }

    /// Serialize one subtree. Serializing the root is the whole document.
    pub fn serialize_node(&self, id: NodeId) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_node(&mut writer, id)?;
        Ok(writer.into_inner().into_inner())
    }

    fn write_node(&self, writer: &mut XmlWriter, id: NodeId) -> Result<()> {
        match self.kind(id) {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(writer, child)?;
                }
            }
            NodeKind::Element { name, attrs } => {
                let mut elem = BytesStart::new(name.as_str());
                for (key, value) in attrs {
                    // Values are wire form already; byte tuples skip the
                    // writer's re-escaping
                    elem.push_attribute((key.as_bytes(), value.as_bytes()));
                }
                let children = self.children(id);
                if children.is_empty() {
                    writer.write_event(Event::Empty(elem))?;
                } else {
                    writer.write_event(Event::Start(elem))?;
                    for &child in children {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
            // Text is stored escaped; write it back verbatim
            NodeKind::Text(escaped) => {
                writer.write_event(Event::Text(BytesText::from_escaped(escaped.as_str())))?;
            }
            NodeKind::Comment(body) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(body.as_str())))?;
            }
            NodeKind::Doctype(body) => {
                writer.write_event(Event::DocType(BytesText::from_escaped(body.as_str())))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
