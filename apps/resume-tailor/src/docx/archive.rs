//! ZIP container handling for DOCX packages

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::docx::error::{DocxError, Result};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// An unpacked DOCX package.
///
/// Parts are kept in their original archive order so that a save reproduces
/// the package layout Word wrote (`[Content_Types].xml` first, and so on).
#[derive(Debug, Default)]
pub struct DocxArchive {
    order: Vec<String>,
    parts: HashMap<String, Vec<u8>>,
}

impl DocxArchive {
    /// Open and unpack a DOCX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Unpack from any `Read + Seek` source
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut zip = ZipArchive::new(reader)?;
        let mut archive = Self::default();

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().to_string();
            if entry.is_dir() {
                continue;
            }

            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut contents)?;
            archive.set(name, contents);
        }

        if !archive.contains(DOCUMENT_PART) {
            return Err(DocxError::MissingPart(DOCUMENT_PART.to_string()));
        }

        Ok(archive)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.parts.get(path).map(|v| v.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.contains_key(path)
    }

    /// Main document content (`word/document.xml`)
    pub fn document_xml(&self) -> Result<&[u8]> {
        self.get(DOCUMENT_PART)
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))
    }

    /// Relationships of the main document part, if the package has any
    pub fn document_rels_xml(&self) -> Option<&[u8]> {
        self.get(DOCUMENT_RELS_PART)
    }

    /// Insert or replace a part. New parts are appended after existing ones.
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        let path = path.into();
        if !self.parts.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.parts.insert(path, contents);
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in &self.order {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(&self.parts[path])?;
        }

        zip.finish()?;
        Ok(())
    }
}
