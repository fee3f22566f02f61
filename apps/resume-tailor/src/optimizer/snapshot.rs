//! Run/Format Snapshot: captures a paragraph's visual decomposition before it is rewritten.
//!
//! Runs are read in document order: direct `w:r` children, runs nested in
//! `w:hyperlink`, and runs inside inline wrappers such as smart tags,
//! insertions, content controls and simple fields. The rewriter flattens
//! those wrappers; only hyperlinks are rebuilt. Each run's text is its `w:t` content with `w:tab` as `\t`
//! and `w:br`/`w:cr` as `\n`, so the concatenation of all snapshot texts is
//! exactly what [`paragraph_text`] returns.

use crate::docx::{wml, DocxError, XmlElement};

/// Style attributes and text of one original run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    pub text: String,
    /// Character style id (`w:rStyle`), preserved not interpreted
    pub style: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub font_name: Option<String>,
    /// Points (`w:sz` holds half-points)
    pub font_size: Option<f32>,
    pub font_color: Option<Rgb>,
    /// Relationship id of the enclosing `w:hyperlink`
    pub hyperlink_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse the six-digit hex form used by `w:color`; `auto` and anything else yields `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSpacingRule {
    Auto,
    Exact,
    AtLeast,
}

impl LineSpacingRule {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "exact" => Some(Self::Exact),
            "atLeast" => Some(Self::AtLeast),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Exact => "exact",
            Self::AtLeast => "atLeast",
        }
    }
}

/// Paragraph-level properties. Lengths are twentieths of a point, as stored in `w:pPr`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphFormatSnapshot {
    pub left_indent: Option<i64>,
    pub right_indent: Option<i64>,
    /// Negative for a hanging indent
    pub first_line_indent: Option<i64>,
    pub space_before: Option<i64>,
    pub space_after: Option<i64>,
    pub line_spacing: Option<i64>,
    pub line_spacing_rule: Option<LineSpacingRule>,
    pub alignment: Option<String>,
    pub keep_together: Option<bool>,
    pub keep_with_next: Option<bool>,
    pub page_break_before: Option<bool>,
    pub widow_control: Option<bool>,
}

/// Child order of `w:pPr` (CT_PPrBase), restricted to what this module writes plus
/// the elements that may already surround them.
pub(crate) const P_PR_ORDER: &[&str] = &[
    "w:pStyle",
    "w:keepNext",
    "w:keepLines",
    "w:pageBreakBefore",
    "w:framePr",
    "w:widowControl",
    "w:numPr",
    "w:suppressLineNumbers",
    "w:pBdr",
    "w:shd",
    "w:tabs",
    "w:suppressAutoHyphens",
    "w:kinsoku",
    "w:wordWrap",
    "w:overflowPunct",
    "w:topLinePunct",
    "w:autoSpaceDE",
    "w:autoSpaceDN",
    "w:bidi",
    "w:adjustRightInd",
    "w:snapToGrid",
    "w:spacing",
    "w:ind",
    "w:contextualSpacing",
    "w:mirrorIndents",
    "w:suppressOverlap",
    "w:jc",
    "w:textDirection",
    "w:textAlignment",
    "w:textboxTightWrap",
    "w:outlineLvl",
    "w:divId",
    "w:cnfStyle",
    "w:rPr",
    "w:sectPr",
    "w:pPrChange",
];

/// Capture every run of `paragraph` plus its paragraph format.
pub fn capture(
    paragraph: &XmlElement,
) -> Result<(Vec<RunSnapshot>, ParagraphFormatSnapshot), DocxError> {
    if !paragraph.is(wml::P) {
        return Err(DocxError::InvalidStructure(format!(
            "expected <{}>, found <{}>",
            wml::P,
            paragraph.name
        )));
    }

    let runs = visible_runs(paragraph)
        .into_iter()
        .map(|(run, link)| capture_run(run, link.map(str::to_string)))
        .collect();

    let format = paragraph
        .child(wml::P_PR)
        .map(capture_format)
        .unwrap_or_default();

    Ok((runs, format))
}

/// Full visible text of a paragraph, using the same run rules as [`capture`].
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    for (run, _) in visible_runs(paragraph) {
        push_run_text(run, &mut text);
    }
    text
}

/// Inline containers whose runs are part of the paragraph's visible text.
///
/// `w:del` and `w:moveFrom` are absent: their runs hold deleted text.
const RUN_WRAPPERS: &[&str] = &[
    "w:smartTag",
    "w:customXml",
    "w:ins",
    "w:moveTo",
    "w:sdt",
    "w:sdtContent",
    "w:fldSimple",
];

/// Every visible run in document order, with the relationship id of its enclosing hyperlink.
fn visible_runs(paragraph: &XmlElement) -> Vec<(&XmlElement, Option<&str>)> {
    let mut runs = Vec::new();
    collect_runs(paragraph, None, &mut runs);
    runs
}

fn collect_runs<'a>(
    parent: &'a XmlElement,
    hyperlink_id: Option<&'a str>,
    out: &mut Vec<(&'a XmlElement, Option<&'a str>)>,
) {
    for child in parent.elements() {
        if child.is(wml::R) {
            out.push((child, hyperlink_id));
        } else if child.is(wml::HYPERLINK) {
            collect_runs(child, child.attr(wml::REL_ID), out);
        } else if RUN_WRAPPERS.iter().any(|name| child.is(name)) {
            collect_runs(child, hyperlink_id, out);
        }
    }
}

fn push_run_text(run: &XmlElement, out: &mut String) {
    for part in run.elements() {
        match part.name.as_str() {
            wml::T => out.push_str(&part.text()),
            wml::TAB => out.push('\t'),
            wml::BR | wml::CR => out.push('\n'),
            _ => {}
        }
    }
}

fn capture_run(run: &XmlElement, hyperlink_id: Option<String>) -> RunSnapshot {
    let mut text = String::new();
    push_run_text(run, &mut text);

    let mut snapshot = RunSnapshot {
        text,
        hyperlink_id,
        ..Default::default()
    };

    let Some(rpr) = run.child(wml::R_PR) else {
        return snapshot;
    };

    snapshot.style = val(rpr, "w:rStyle").map(str::to_string);
    snapshot.bold = toggle(rpr, "w:b");
    snapshot.italic = toggle(rpr, "w:i");
    snapshot.underline = rpr
        .child("w:u")
        .map(|u| !matches!(u.attr(wml::VAL), Some("none") | Some("0") | Some("false")));
    snapshot.font_name = rpr
        .child("w:rFonts")
        .and_then(|f| f.attr("w:ascii").or_else(|| f.attr("w:hAnsi")))
        .map(str::to_string);
    snapshot.font_size = val(rpr, "w:sz")
        .and_then(|v| v.parse::<f32>().ok())
        .map(|half_points| half_points / 2.0);
    snapshot.font_color = val(rpr, "w:color").and_then(Rgb::from_hex);

    snapshot
}

fn capture_format(ppr: &XmlElement) -> ParagraphFormatSnapshot {
    let ind = ppr.child("w:ind");
    let spacing = ppr.child("w:spacing");
    let first_line = twips(ind, &["w:firstLine"]);
    let hanging = twips(ind, &["w:hanging"]).map(|h| -h);

    ParagraphFormatSnapshot {
        left_indent: twips(ind, &["w:left", "w:start"]),
        right_indent: twips(ind, &["w:right", "w:end"]),
        first_line_indent: hanging.or(first_line),
        space_before: twips(spacing, &["w:before"]),
        space_after: twips(spacing, &["w:after"]),
        line_spacing: twips(spacing, &["w:line"]),
        line_spacing_rule: spacing
            .and_then(|s| s.attr("w:lineRule"))
            .and_then(LineSpacingRule::parse),
        alignment: val(ppr, "w:jc").map(str::to_string),
        keep_together: toggle(ppr, "w:keepLines"),
        keep_with_next: toggle(ppr, "w:keepNext"),
        page_break_before: toggle(ppr, "w:pageBreakBefore"),
        widow_control: toggle(ppr, "w:widowControl"),
    }
}

impl ParagraphFormatSnapshot {
    /// Write each captured field back onto the paragraph's `w:pPr`.
    ///
    /// Fields are applied one at a time; a `None` field leaves whatever the
    /// paragraph currently has untouched.
    pub fn apply(&self, paragraph: &mut XmlElement) {
        if *self == Self::default() {
            return;
        }

        let ppr = paragraph.child_or_prepend(wml::P_PR);

        set_toggle(ppr, "w:keepNext", self.keep_with_next);
        set_toggle(ppr, "w:keepLines", self.keep_together);
        set_toggle(ppr, "w:pageBreakBefore", self.page_break_before);
        set_toggle(ppr, "w:widowControl", self.widow_control);

        if self.space_before.is_some()
            || self.space_after.is_some()
            || self.line_spacing.is_some()
            || self.line_spacing_rule.is_some()
        {
            let spacing = ppr.child_or_insert("w:spacing", P_PR_ORDER);
            set_twips(spacing, "w:before", self.space_before);
            set_twips(spacing, "w:after", self.space_after);
            set_twips(spacing, "w:line", self.line_spacing);
            if let Some(rule) = self.line_spacing_rule {
                spacing.set_attr("w:lineRule", rule.as_str());
            }
        }

        if self.left_indent.is_some()
            || self.right_indent.is_some()
            || self.first_line_indent.is_some()
        {
            let ind = ppr.child_or_insert("w:ind", P_PR_ORDER);
            set_twips(ind, "w:left", self.left_indent);
            set_twips(ind, "w:right", self.right_indent);
            match self.first_line_indent {
                Some(v) if v < 0 => {
                    ind.remove_attr("w:firstLine");
                    ind.set_attr("w:hanging", (-v).to_string());
                }
                Some(v) => {
                    ind.remove_attr("w:hanging");
                    ind.set_attr("w:firstLine", v.to_string());
                }
                None => {}
            }
        }

        if let Some(alignment) = &self.alignment {
            ppr.child_or_insert("w:jc", P_PR_ORDER)
                .set_attr(wml::VAL, alignment.as_str());
        }
    }
}

fn twips(element: Option<&XmlElement>, names: &[&str]) -> Option<i64> {
    element
        .and_then(|e| names.iter().find_map(|n| e.attr(n)))
        .and_then(|v| v.parse::<i64>().ok())
}

fn val<'a>(parent: &'a XmlElement, name: &str) -> Option<&'a str> {
    parent.child(name).and_then(|e| e.attr(wml::VAL))
}

/// OOXML on/off property: present without `w:val` means on.
fn toggle(parent: &XmlElement, name: &str) -> Option<bool> {
    parent.child(name).map(|e| {
        !matches!(
            e.attr(wml::VAL),
            Some("0") | Some("false") | Some("off")
        )
    })
}

fn set_toggle(ppr: &mut XmlElement, name: &str, value: Option<bool>) {
    let Some(on) = value else {
        return;
    };
    let element = ppr.child_or_insert(name, P_PR_ORDER);
    if on {
        element.remove_attr(wml::VAL);
    } else {
        element.set_attr(wml::VAL, "0");
    }
}

fn set_twips(element: &mut XmlElement, name: &str, value: Option<i64>) {
    if let Some(v) = value {
        element.set_attr(name, v.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::test_support::parse_element;
    use crate::docx::XmlNode;

    const STYLED: &str = r#"<w:p>
        <w:pPr><w:pStyle w:val="ListBullet"/><w:keepNext/><w:spacing w:before="120" w:after="60" w:line="276" w:lineRule="auto"/><w:ind w:left="720" w:hanging="360"/><w:jc w:val="both"/></w:pPr>
        <w:r><w:rPr><w:rStyle w:val="Strong"/><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri"/><w:b/><w:i w:val="0"/><w:color w:val="1F4E79"/><w:sz w:val="24"/><w:u w:val="single"/></w:rPr><w:t xml:space="preserve">Led </w:t></w:r>
        <w:hyperlink r:id="rId7"><w:r><w:t>platform</w:t></w:r></w:hyperlink>
        <w:r><w:tab/><w:t>team</w:t><w:br/></w:r>
    </w:p>"#;

    #[test]
    fn test_capture_reads_runs_in_order() {
        let p = parse_element(STYLED);
        let (runs, _) = capture(&p).unwrap();

        let texts: Vec<_> = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["Led ", "platform", "\tteam\n"]);
        let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(joined, paragraph_text(&p));
    }

    #[test]
    fn test_capture_reads_run_properties() {
        let p = parse_element(STYLED);
        let (runs, _) = capture(&p).unwrap();

        let first = &runs[0];
        assert_eq!(first.style.as_deref(), Some("Strong"));
        assert_eq!(first.bold, Some(true));
        assert_eq!(first.italic, Some(false));
        assert_eq!(first.underline, Some(true));
        assert_eq!(first.font_name.as_deref(), Some("Calibri"));
        assert_eq!(first.font_size, Some(12.0));
        assert_eq!(first.font_color, Some(Rgb(0x1F, 0x4E, 0x79)));
        assert_eq!(first.hyperlink_id, None);

        assert_eq!(runs[1].hyperlink_id.as_deref(), Some("rId7"));
        assert_eq!(runs[1].bold, None);
    }

    #[test]
    fn test_capture_reads_paragraph_format() {
        let p = parse_element(STYLED);
        let (_, format) = capture(&p).unwrap();

        assert_eq!(format.left_indent, Some(720));
        assert_eq!(format.first_line_indent, Some(-360));
        assert_eq!(format.space_before, Some(120));
        assert_eq!(format.space_after, Some(60));
        assert_eq!(format.line_spacing, Some(276));
        assert_eq!(format.line_spacing_rule, Some(LineSpacingRule::Auto));
        assert_eq!(format.alignment.as_deref(), Some("both"));
        assert_eq!(format.keep_with_next, Some(true));
        assert_eq!(format.keep_together, None);
        assert_eq!(format.widow_control, None);
    }

    #[test]
    fn test_capture_descends_into_inline_wrappers() {
        let p = parse_element(
            r#"<w:p>
            <w:r><w:t xml:space="preserve">Worked at </w:t></w:r>
            <w:smartTag w:element="place"><w:r><w:rPr><w:b/></w:rPr><w:t>Seattle</w:t></w:r></w:smartTag>
            <w:ins w:id="1" w:author="me"><w:r><w:t xml:space="preserve"> HQ</w:t></w:r></w:ins>
            <w:del w:id="2" w:author="me"><w:r><w:delText>gone</w:delText></w:r></w:del>
            <w:sdt><w:sdtPr><w:rPr><w:i/></w:rPr></w:sdtPr><w:sdtContent><w:r><w:t xml:space="preserve"> since </w:t></w:r></w:sdtContent></w:sdt>
            <w:fldSimple w:instr=" DATE "><w:r><w:t>2021</w:t></w:r></w:fldSimple>
            <w:hyperlink r:id="rId7"><w:smartTag><w:r><w:t>!</w:t></w:r></w:smartTag></w:hyperlink>
        </w:p>"#,
        );
        let (runs, _) = capture(&p).unwrap();

        let texts: Vec<_> = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["Worked at ", "Seattle", " HQ", " since ", "2021", "!"]);
        assert_eq!(runs[1].bold, Some(true));
        assert_eq!(runs[5].hyperlink_id.as_deref(), Some("rId7"));
        assert_eq!(paragraph_text(&p), "Worked at Seattle HQ since 2021!");
    }

    #[test]
    fn test_capture_rejects_non_paragraph() {
        let tbl = parse_element("<w:tbl/>");
        assert!(matches!(capture(&tbl), Err(DocxError::InvalidStructure(_))));
    }

    #[test]
    fn test_apply_format_to_bare_paragraph() {
        let source = parse_element(STYLED);
        let (_, format) = capture(&source).unwrap();

        let mut target = parse_element("<w:p><w:r><w:t>x</w:t></w:r></w:p>");
        format.apply(&mut target);

        let (_, reapplied) = capture(&target).unwrap();
        assert_eq!(reapplied, format);
        assert!(matches!(&target.children[0], XmlNode::Element(e) if e.is(wml::P_PR)));

        let ppr = target.child(wml::P_PR).unwrap();
        let names: Vec<_> = ppr.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["w:keepNext", "w:spacing", "w:ind", "w:jc"]);
    }

    #[test]
    fn test_apply_leaves_unset_fields_alone() {
        let mut p = parse_element(r#"<w:p><w:pPr><w:jc w:val="center"/><w:keepLines/></w:pPr></w:p>"#);
        let format = ParagraphFormatSnapshot {
            space_after: Some(0),
            ..Default::default()
        };
        format.apply(&mut p);

        let (_, after) = capture(&p).unwrap();
        assert_eq!(after.alignment.as_deref(), Some("center"));
        assert_eq!(after.keep_together, Some(true));
        assert_eq!(after.space_after, Some(0));
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::from_hex("FF0080"), Some(Rgb(255, 0, 128)));
        assert_eq!(Rgb::from_hex("auto"), None);
        assert_eq!(Rgb(1, 2, 255).to_hex(), "0102FF");
    }

}
