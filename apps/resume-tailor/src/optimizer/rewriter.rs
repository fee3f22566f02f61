//! Paragraph Rewriter: replaces a paragraph's text while reapplying captured formatting.

use tracing::{debug, warn};

use crate::docx::{wml, ContentTarget, Relationships, XmlElement, XmlNode};
use crate::errors::StructuralMismatch;
use crate::optimizer::redistribute::redistribute;
use crate::optimizer::snapshot::{ParagraphFormatSnapshot, RunSnapshot};

/// What a rewrite produced, including attributes that could not be restored.
#[derive(Debug, Default, PartialEq)]
pub struct RewriteReport {
    pub runs_written: usize,
    pub mismatches: Vec<StructuralMismatch>,
}

/// Rebuild `paragraph` from `new_text`, styled after `runs` and formatted after `format`.
///
/// All content except `w:pPr` is removed first, so the original run elements
/// are gone once this returns. A hyperlink whose relationship id no longer
/// resolves is dropped from the affected runs; the text is still written.
pub fn rewrite(
    paragraph: &mut XmlElement,
    new_text: &str,
    runs: &[RunSnapshot],
    format: &ParagraphFormatSnapshot,
    relationships: &Relationships,
) -> RewriteReport {
    let lengths: Vec<usize> = runs.iter().map(|r| r.text.chars().count()).collect();
    let slices = redistribute(&lengths, new_text);

    clear_content(paragraph);

    let mut report = RewriteReport::default();
    let mut open_link: Option<(String, XmlElement)> = None;

    for slice in slices {
        let snapshot = slice.source.and_then(|i| runs.get(i));
        let run = build_run(snapshot, &slice.text);
        report.runs_written += 1;

        let link_id = snapshot.and_then(|s| s.hyperlink_id.as_deref());
        match link_id {
            Some(id) if relationships.is_hyperlink(id) => match open_link.as_mut() {
                Some((open_id, link)) if open_id.as_str() == id => link.push(run),
                _ => {
                    flush_link(paragraph, open_link.take());
                    let link = XmlElement::new(wml::HYPERLINK)
                        .with_attr(wml::REL_ID, id)
                        .with_child(run);
                    open_link = Some((id.to_string(), link));
                }
            },
            Some(id) => {
                warn!("Skipping hyperlink re-attachment: relationship '{id}' is missing or not a hyperlink");
                if !report
                    .mismatches
                    .iter()
                    .any(|m| matches!(m, StructuralMismatch::StaleHyperlink(s) if s == id))
                {
                    report
                        .mismatches
                        .push(StructuralMismatch::StaleHyperlink(id.to_string()));
                }
                flush_link(paragraph, open_link.take());
                ContentTarget::Paragraph(paragraph).append_content(run);
            }
            None => {
                flush_link(paragraph, open_link.take());
                ContentTarget::Paragraph(paragraph).append_content(run);
            }
        }
    }
    flush_link(paragraph, open_link.take());

    format.apply(paragraph);

    debug!(
        "Rewrote paragraph into {} runs ({} original)",
        report.runs_written,
        runs.len()
    );
    report
}

fn flush_link(paragraph: &mut XmlElement, link: Option<(String, XmlElement)>) {
    if let Some((_, link)) = link {
        ContentTarget::Paragraph(paragraph).append_content(link);
    }
}

/// Remove everything but the paragraph properties.
fn clear_content(paragraph: &mut XmlElement) {
    paragraph
        .children
        .retain(|n| matches!(n, XmlNode::Element(e) if e.is(wml::P_PR)));
}

fn build_run(snapshot: Option<&RunSnapshot>, text: &str) -> XmlElement {
    let mut run = XmlElement::new(wml::R);

    if let Some(rpr) = snapshot.and_then(build_run_properties) {
        run.push(rpr);
    }

    let mut pending = String::new();
    for ch in text.chars() {
        match ch {
            '\t' | '\n' => {
                push_text(&mut run, &mut pending);
                let name = if ch == '\t' { wml::TAB } else { wml::BR };
                run.push(XmlElement::new(name));
            }
            // no run element for a lone CR; section text is normalized to \n upstream
            '\r' => {}
            _ => pending.push(ch),
        }
    }
    push_text(&mut run, &mut pending);

    run
}

fn push_text(run: &mut XmlElement, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut t = XmlElement::new(wml::T);
    if pending.starts_with(char::is_whitespace) || pending.ends_with(char::is_whitespace) {
        t.set_attr(wml::XML_SPACE, "preserve");
    }
    run.push(t.with_text(std::mem::take(pending)));
}

/// `w:rPr` children in schema order (CT_RPr): rStyle, rFonts, b, i, color, sz, u.
fn build_run_properties(snapshot: &RunSnapshot) -> Option<XmlElement> {
    let mut rpr = XmlElement::new(wml::R_PR);

    if let Some(style) = &snapshot.style {
        rpr.push(XmlElement::new("w:rStyle").with_attr(wml::VAL, style.as_str()));
    }
    if let Some(font) = &snapshot.font_name {
        rpr.push(
            XmlElement::new("w:rFonts")
                .with_attr("w:ascii", font.as_str())
                .with_attr("w:hAnsi", font.as_str()),
        );
    }
    if let Some(bold) = snapshot.bold {
        rpr.push(toggle("w:b", bold));
    }
    if let Some(italic) = snapshot.italic {
        rpr.push(toggle("w:i", italic));
    }
    if let Some(color) = snapshot.font_color {
        rpr.push(XmlElement::new("w:color").with_attr(wml::VAL, color.to_hex()));
    }
    if let Some(size) = snapshot.font_size {
        let half_points = (size * 2.0).round() as i64;
        rpr.push(XmlElement::new("w:sz").with_attr(wml::VAL, half_points.to_string()));
    }
    if let Some(underline) = snapshot.underline {
        let val = if underline { "single" } else { "none" };
        rpr.push(XmlElement::new("w:u").with_attr(wml::VAL, val));
    }

    (!rpr.children.is_empty()).then_some(rpr)
}

fn toggle(name: &str, on: bool) -> XmlElement {
    let element = XmlElement::new(name);
    if on {
        element
    } else {
        element.with_attr(wml::VAL, "0")
    }
}
