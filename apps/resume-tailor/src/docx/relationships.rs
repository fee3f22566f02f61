//! Relationship parts (`_rels/*.rels`)
//!
//! OOXML maps relationship IDs (`rId7`) to targets. Hyperlinks in
//! `document.xml` only carry the ID, so the rewriter checks IDs against this
//! map before re-attaching a captured hyperlink.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::docx::error::Result;

/// Relationship type of external hyperlinks
pub const TYPE_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Relationship types of one package part, keyed by id
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    types: HashMap<String, String>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut types = HashMap::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut rel_type = None;

                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                            b"Type" => rel_type = Some(attr.unescape_value()?.into_owned()),
                            _ => {}
                        }
                    }

                    if let Some(id) = id {
                        types.insert(id, rel_type.unwrap_or_default());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { types })
    }

    /// Whether `id` resolves to a hyperlink relationship
    pub fn is_hyperlink(&self, id: &str) -> bool {
        self.types.get(id).is_some_and(|t| t == TYPE_HYPERLINK)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = Relationships::parse(RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels.is_hyperlink("rId5"));
        assert!(!rels.is_hyperlink("rId1"));
        assert!(!rels.is_hyperlink("rId9"));
    }

    #[test]
    fn test_empty_relationships() {
        let rels = Relationships::new();
        assert_eq!(rels.len(), 0);
        assert!(!rels.is_hyperlink("rId1"));
    }
}
