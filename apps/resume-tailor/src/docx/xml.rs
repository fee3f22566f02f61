//! Lossless XML tree over `quick-xml` events.
//!
//! The rewriter edits `document.xml` in place, so everything it does not
//! understand (drawings, bookmarks, section properties, vendor extensions)
//! must survive a parse/serialize cycle untouched. Element names are kept as
//! written, prefix included (`w:p`, `r:id`).

use std::borrow::Cow;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::docx::error::{DocxError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A parsed XML part: optional declaration plus the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub declaration: Option<Declaration>,
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub standalone: Option<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child element append
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place to keep attribute order.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|(k, _)| k != name);
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|n| match n {
            XmlNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Element child at raw index `index` of `children`, if that node is an element.
    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut XmlElement> {
        match self.children.get_mut(index) {
            Some(XmlNode::Element(e)) => Some(e),
            _ => None,
        }
    }

    /// Return the named child, inserting it first if absent.
    ///
    /// `schema_order` lists sibling names in the order the schema requires;
    /// a new child is placed before the first existing sibling that must follow it.
    pub fn child_or_insert(&mut self, name: &str, schema_order: &[&str]) -> &mut XmlElement {
        let existing = self
            .children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(e) if e.name == name));

        let index = match existing {
            Some(i) => i,
            None => {
                let rank = schema_order.iter().position(|n| *n == name);
                let insert_at = rank
                    .and_then(|rank| {
                        self.children.iter().position(|n| match n {
                            XmlNode::Element(e) => schema_order
                                .iter()
                                .position(|s| *s == e.name)
                                .is_some_and(|r| r > rank),
                            _ => false,
                        })
                    })
                    .unwrap_or(self.children.len());
                self.children
                    .insert(insert_at, XmlNode::Element(XmlElement::new(name)));
                insert_at
            }
        };

        match &mut self.children[index] {
            XmlNode::Element(e) => e,
            _ => unreachable!("index points at an element"),
        }
    }

    /// Return the named child, inserting it as the first child if absent.
    pub fn child_or_prepend(&mut self, name: &str) -> &mut XmlElement {
        let index = match self
            .children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(e) if e.name == name))
        {
            Some(i) => i,
            None => {
                self.children
                    .insert(0, XmlNode::Element(XmlElement::new(name)));
                0
            }
        };

        match &mut self.children[index] {
            XmlNode::Element(e) => e,
            _ => unreachable!("index points at an element"),
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Concatenated character data of this element's direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl XmlDocument {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        // Whitespace inside w:t is content.
        reader.config_mut().trim_text(false);

        let mut declaration = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Decl(d) => {
                    let standalone = d
                        .standalone()
                        .and_then(|s| s.ok())
                        .map(|s| String::from_utf8_lossy(&s).into_owned());
                    declaration = Some(Declaration { standalone });
                }
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        DocxError::InvalidStructure("unbalanced end tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::Text(t) => {
                    if !stack.is_empty() {
                        let text = t.unescape()?.into_owned();
                        attach(&mut stack, &mut root, XmlNode::Text(text))?;
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    attach(&mut stack, &mut root, XmlNode::CData(text))?;
                }
                Event::Comment(c) => {
                    if !stack.is_empty() {
                        let text = String::from_utf8_lossy(&c).into_owned();
                        attach(&mut stack, &mut root, XmlNode::Comment(text))?;
                    }
                }
                Event::PI(p) => {
                    if !stack.is_empty() {
                        let text = String::from_utf8_lossy(&p).into_owned();
                        attach(&mut stack, &mut root, XmlNode::ProcessingInstruction(text))?;
                    }
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(DocxError::InvalidStructure(format!(
                "unclosed element <{}>",
                stack[stack.len() - 1].name
            )));
        }

        let root = root
            .ok_or_else(|| DocxError::InvalidStructure("document has no root element".into()))?;
        Ok(Self { declaration, root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                "1.0",
                Some("UTF-8"),
                decl.standalone.as_deref(),
            )))?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }

        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn element_from_start(e: &BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => match node {
            XmlNode::Element(e) if root.is_none() => *root = Some(e),
            XmlNode::Element(e) => {
                return Err(DocxError::InvalidStructure(format!(
                    "second root element <{}>",
                    e.name
                )))
            }
            // Top-level misc content outside the root carries no document meaning.
            _ => {}
        },
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            XmlNode::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            XmlNode::Comment(t) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
            }
            XmlNode::ProcessingInstruction(t) => {
                writer.write_event(Event::PI(BytesPI::new(t.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(Cow::Borrowed(element.name.as_str()))))?;
    Ok(())
}

/// First character of `text` outside the XML 1.0 `Char` production.
///
/// quick-xml escapes markup but writes control characters through unchanged,
/// so text containing one would make the serialized part unreadable.
pub fn first_invalid_char(text: &str) -> Option<char> {
    text.chars().find(|&c| {
        !matches!(
            c,
            '\u{9}'
                | '\u{A}'
                | '\u{D}'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}'
        )
    })
}
