//! The resume document: package + parsed main part + hyperlink relationships.

use std::io::Cursor;
use std::path::Path;

use tracing::debug;

use crate::docx::archive::{DocxArchive, DOCUMENT_PART};
use crate::docx::error::{DocxError, Result};
use crate::docx::relationships::Relationships;
use crate::docx::wml;
use crate::docx::xml::{XmlDocument, XmlElement, XmlNode};

/// A loaded DOCX template, exclusively owned by one optimization run.
#[derive(Debug)]
pub struct ResumeDocument {
    archive: DocxArchive,
    content: XmlDocument,
    relationships: Relationships,
}

impl ResumeDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_archive(DocxArchive::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_archive(DocxArchive::from_reader(Cursor::new(bytes))?)
    }

    fn from_archive(archive: DocxArchive) -> Result<Self> {
        let content = XmlDocument::parse(archive.document_xml()?)?;
        if !content.root.is(wml::DOCUMENT) {
            return Err(DocxError::InvalidStructure(format!(
                "expected <{}> root, found <{}>",
                wml::DOCUMENT,
                content.root.name
            )));
        }
        if content.root.child(wml::BODY).is_none() {
            return Err(DocxError::MissingPart(format!("{DOCUMENT_PART} <w:body>")));
        }

        let relationships = match archive.document_rels_xml() {
            Some(xml) => Relationships::parse(xml)?,
            None => Relationships::new(),
        };
        debug!(
            "Loaded document: {} parts, {} relationships",
            archive.part_names().count(),
            relationships.len()
        );

        Ok(Self {
            archive,
            content,
            relationships,
        })
    }

    pub fn body(&self) -> Result<&XmlElement> {
        self.content
            .root
            .child(wml::BODY)
            .ok_or_else(|| DocxError::InvalidStructure("document has no <w:body>".into()))
    }

    /// Mutable body together with the relationships needed to validate hyperlinks.
    pub fn parts_mut(&mut self) -> Result<(&mut XmlElement, &Relationships)> {
        let body = self
            .content
            .root
            .child_mut(wml::BODY)
            .ok_or_else(|| DocxError::InvalidStructure("document has no <w:body>".into()))?;
        Ok((body, &self.relationships))
    }

    /// Serialize the (possibly mutated) main part back into the package and write it.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.sync_main_part()?;
        self.archive.write_to_file(path)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.sync_main_part()?;
        let mut buffer = Cursor::new(Vec::new());
        self.archive.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    fn sync_main_part(&mut self) -> Result<()> {
        let xml = self.content.to_bytes()?;
        self.archive.set(DOCUMENT_PART, xml);
        Ok(())
    }
}

/// A container of block or inline content.
///
/// - `Document`: body-level blocks (paragraphs, tables), kept before the trailing `w:sectPr`
/// - `Paragraph`: runs and hyperlinks
/// - `Cell`: paragraphs and nested tables
pub enum ContentTarget<'a> {
    Document(&'a mut XmlElement),
    Paragraph(&'a mut XmlElement),
    Cell(&'a mut XmlElement),
}

impl<'a> ContentTarget<'a> {
    /// The `w:p` at raw child `index` of a block container.
    ///
    /// `None` for a paragraph target, or when the index holds something else.
    pub fn into_paragraph(self, index: usize) -> Option<&'a mut XmlElement> {
        let container = match self {
            ContentTarget::Document(body) => body,
            ContentTarget::Cell(cell) => cell,
            ContentTarget::Paragraph(_) => return None,
        };
        container
            .element_at_mut(index)
            .filter(|e| e.is(wml::P))
    }

    pub fn append_content(&mut self, content: XmlElement) {
        match self {
            ContentTarget::Document(body) => {
                let sect_pr = body
                    .children
                    .iter()
                    .rposition(|n| matches!(n, XmlNode::Element(e) if e.is(wml::SECT_PR)));
                match sect_pr {
                    Some(i) => body.children.insert(i, XmlNode::Element(content)),
                    None => body.push(content),
                }
            }
            ContentTarget::Paragraph(paragraph) => paragraph.push(content),
            ContentTarget::Cell(cell) => cell.push(content),
        }
    }
}
