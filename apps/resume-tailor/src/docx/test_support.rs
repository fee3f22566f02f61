//! In-memory DOCX fixtures for unit tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::docx::wml;
use crate::docx::xml::{XmlDocument, XmlElement};

pub const HYPERLINK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://github.com/jdoe" TargetMode="External"/>
</Relationships>"#;

/// Wrap body content in a `w:document` with the usual namespace declarations.
pub fn wrap_body(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{inner}</w:body></w:document>"#
    )
}

/// Build a DOCX package around the given `document.xml` content.
pub fn build_package(document_xml: &str, document_rels: Option<&str>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#,
    )
    .unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#,
    )
    .unwrap();

    if let Some(rels) = document_rels {
        zip.start_file("word/_rels/document.xml.rels", options)
            .unwrap();
        zip.write_all(rels.as_bytes()).unwrap();
    }

    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document_xml.as_bytes()).unwrap();

    zip.finish().unwrap();
    buffer.into_inner()
}

/// Parse body content into a `w:body` element.
pub fn parse_body(inner: &str) -> XmlElement {
    let doc = XmlDocument::parse(wrap_body(inner).as_bytes()).unwrap();
    doc.root.child(wml::BODY).unwrap().clone()
}

/// Parse a single element (e.g. one `w:p`) declared in the w/r namespaces.
pub fn parse_element(xml: &str) -> XmlElement {
    parse_body(xml).elements().next().unwrap().clone()
}

/// A plain single-run paragraph.
pub fn paragraph(text: &str) -> XmlElement {
    XmlElement::new(wml::P).with_child(
        XmlElement::new(wml::R).with_child(XmlElement::new(wml::T).with_text(text)),
    )
}
