//! Container Tree Walker: finds every rewritable paragraph and drives the rewrite.
//!
//! Traversal order is fixed: top-level paragraphs in document order, then
//! top-level tables. Tables are walked row-major; inside a cell its own
//! paragraphs come first, then its nested tables (depth-first), before the
//! next cell. Whitespace-only paragraphs are not sections.
//!
//! Locations are computed once up front as a container (the body or a table
//! cell, by child-index path from `w:body`) plus the paragraph's index in it.
//! Rewriting only touches a paragraph's own children, so the locations stay
//! valid for the whole pass and every node is borrowed mutably exactly once.
//!
//! A replacement holding characters XML 1.0 cannot represent fails its
//! section like any other visitor error; the paragraph is left as it was.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::docx::xml::first_invalid_char;
use crate::docx::{wml, ContentTarget, DocxError, ResumeDocument, XmlElement, XmlNode};
use crate::errors::AppError;
use crate::optimizer::rewriter::rewrite;
use crate::optimizer::snapshot::{capture, paragraph_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Paragraph,
    TableCell,
}

impl SectionKind {
    pub fn label(self) -> &'static str {
        match self {
            SectionKind::Paragraph => "paragraph",
            SectionKind::TableCell => "table cell",
        }
    }
}

/// One non-blank paragraph, as handed to the visitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// 1-based position in traversal order
    pub position: usize,
    pub total: usize,
    pub kind: SectionKind,
    /// Paragraph text with surrounding whitespace trimmed
    pub text: String,
}

/// Produces the replacement text for a section.
#[async_trait]
pub trait SectionVisitor: Send {
    async fn visit(&mut self, section: &Section) -> Result<String, AppError>;
}

/// Receives progress events from the walker.
pub trait ProgressReporter {
    fn section_started(&mut self, section: &Section);
    fn section_rewritten(&mut self, section: &Section, replacement: &str);
    fn section_failed(&mut self, section: &Section, error: &AppError);
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionFailure {
    pub position: usize,
    pub kind: SectionKind,
    pub message: String,
}

/// Outcome of one document pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkSummary {
    pub total: usize,
    pub rewritten: usize,
    pub failures: Vec<SectionFailure>,
}

#[derive(Debug)]
struct Located {
    /// Raw `children` indices from `w:body` down to the enclosing `w:tc`; empty for the body
    container: Vec<usize>,
    /// Raw index of the paragraph within its container
    index: usize,
    kind: SectionKind,
    text: String,
}

/// Number of sections [`for_each_section`] will visit.
pub fn count_sections(document: &ResumeDocument) -> Result<usize, DocxError> {
    Ok(locate_sections(document.body()?).len())
}

/// Visit every section in order, rewriting each paragraph with the visitor's output.
///
/// A visitor error is recorded in the summary and the paragraph keeps its
/// original content; the pass continues with the next section. Only a broken
/// document structure aborts the walk.
pub async fn for_each_section<V, R>(
    document: &mut ResumeDocument,
    visitor: &mut V,
    reporter: &mut R,
) -> Result<WalkSummary, DocxError>
where
    V: SectionVisitor + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let located = locate_sections(document.body()?);
    let total = located.len();
    info!("Walking {total} sections");

    let mut summary = WalkSummary {
        total,
        ..Default::default()
    };

    for (position, located) in located.into_iter().enumerate() {
        let Located {
            container,
            index,
            kind,
            text,
        } = located;
        let section = Section {
            position: position + 1,
            total,
            kind,
            text,
        };
        reporter.section_started(&section);

        let replacement = match visitor.visit(&section).await.and_then(check_replacement) {
            Ok(replacement) => replacement,
            Err(e) => {
                warn!(
                    "Error processing {} {}: {e}",
                    section.kind.label(),
                    section.position
                );
                reporter.section_failed(&section, &e);
                summary.failures.push(SectionFailure {
                    position: section.position,
                    kind: section.kind,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let (body, relationships) = document.parts_mut()?;
        let paragraph = resolve_paragraph(body, &container, index).ok_or_else(|| {
            DocxError::InvalidStructure(format!(
                "section {} no longer resolves to a paragraph",
                section.position
            ))
        })?;

        let (runs, format) = capture(paragraph)?;
        let report = rewrite(paragraph, &replacement, &runs, &format, relationships);
        for mismatch in &report.mismatches {
            debug!("Section {}: {mismatch}", section.position);
        }

        reporter.section_rewritten(&section, &replacement);
        summary.rewritten += 1;
    }

    info!(
        "Walk finished: {}/{} sections rewritten, {} failed",
        summary.rewritten,
        summary.total,
        summary.failures.len()
    );
    Ok(summary)
}

fn locate_sections(body: &XmlElement) -> Vec<Located> {
    let mut found = Vec::new();

    for (i, p) in element_children(body, wml::P) {
        push_if_nonblank(&mut found, Vec::new(), i, p, SectionKind::Paragraph);
    }
    for (i, table) in element_children(body, wml::TBL) {
        locate_in_table(table, vec![i], &mut found);
    }

    found
}

fn locate_in_table(table: &XmlElement, prefix: Vec<usize>, found: &mut Vec<Located>) {
    for (r, row) in element_children(table, wml::TR) {
        for (c, cell) in element_children(row, wml::TC) {
            let cell_path = [prefix.as_slice(), &[r, c]].concat();

            for (i, p) in element_children(cell, wml::P) {
                push_if_nonblank(found, cell_path.clone(), i, p, SectionKind::TableCell);
            }
            for (i, nested) in element_children(cell, wml::TBL) {
                locate_in_table(nested, [cell_path.as_slice(), &[i]].concat(), found);
            }
        }
    }
}

fn push_if_nonblank(
    found: &mut Vec<Located>,
    container: Vec<usize>,
    index: usize,
    p: &XmlElement,
    kind: SectionKind,
) {
    let text = paragraph_text(p);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        found.push(Located {
            container,
            index,
            kind,
            text: trimmed.to_string(),
        });
    }
}

/// Element children with the given name, paired with their raw index in `children`.
fn element_children<'a>(
    parent: &'a XmlElement,
    name: &'a str,
) -> impl Iterator<Item = (usize, &'a XmlElement)> {
    parent
        .children
        .iter()
        .enumerate()
        .filter_map(move |(i, node)| match node {
            XmlNode::Element(e) if e.is(name) => Some((i, e)),
            _ => None,
        })
}

fn resolve_paragraph<'a>(
    body: &'a mut XmlElement,
    container: &[usize],
    index: usize,
) -> Option<&'a mut XmlElement> {
    let target = if container.is_empty() {
        ContentTarget::Document(body)
    } else {
        let mut current = body;
        for &i in container {
            current = current.element_at_mut(i)?;
        }
        if !current.is(wml::TC) {
            return None;
        }
        ContentTarget::Cell(current)
    };
    target.into_paragraph(index)
}

fn check_replacement(replacement: String) -> Result<String, AppError> {
    match first_invalid_char(&replacement) {
        Some(c) => Err(AppError::Generation(format!(
            "replacement contains U+{:04X}, which is not allowed in a document",
            c as u32
        ))),
        None => Ok(replacement),
    }
}
