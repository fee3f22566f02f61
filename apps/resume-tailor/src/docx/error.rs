//! Error types for DOCX package handling

use thiserror::Error;

/// Errors raised while reading, navigating or writing a DOCX package
#[derive(Error, Debug)]
pub enum DocxError {
    /// Error reading or writing the ZIP container
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute inside an XML start tag
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Invalid character or entity reference in text or attribute values
    #[error("XML escape error: {0}")]
    XmlEscape(#[from] quick_xml::escape::EscapeError),

    /// Required package part not found
    #[error("Required part not found: {0}")]
    MissingPart(String),

    /// The XML does not have the expected WordprocessingML shape
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),
}

/// Result type for DOCX operations
pub type Result<T> = std::result::Result<T, DocxError>;
