//! Document I/O for DOCX resume templates.
//!
//! A DOCX file is a ZIP package. Only `word/document.xml` is parsed (into a
//! lossless XML tree) and re-serialized; every other part is carried through
//! byte-for-byte so the saved file keeps styles, numbering, headers and media.

pub mod archive;
pub mod document;
pub mod error;
pub mod relationships;
pub mod xml;

#[cfg(test)]
pub mod test_support;

pub use document::{ContentTarget, ResumeDocument};
pub use error::DocxError;
pub use relationships::Relationships;
pub use xml::{XmlElement, XmlNode};

/// WordprocessingML element and attribute names as they appear in `document.xml`.
pub mod wml {
    pub const DOCUMENT: &str = "w:document";
    pub const BODY: &str = "w:body";
    pub const SECT_PR: &str = "w:sectPr";

    pub const P: &str = "w:p";
    pub const P_PR: &str = "w:pPr";
    pub const R: &str = "w:r";
    pub const R_PR: &str = "w:rPr";
    pub const T: &str = "w:t";
    pub const TAB: &str = "w:tab";
    pub const BR: &str = "w:br";
    pub const CR: &str = "w:cr";
    pub const HYPERLINK: &str = "w:hyperlink";

    pub const TBL: &str = "w:tbl";
    pub const TR: &str = "w:tr";
    pub const TC: &str = "w:tc";

    pub const VAL: &str = "w:val";
    pub const REL_ID: &str = "r:id";
    pub const XML_SPACE: &str = "xml:space";
}
