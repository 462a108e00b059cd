//! Mutable views over WordprocessingML paragraphs and runs.
//!
//! The views borrow elements of a parsed part and edit them in place; they own
//! no data of their own.

use crate::docx::{Element, Node, WML_NS, XML_NS, pts_to_twips};
#[cfg(test)]
use crate::docx::twips_to_pts;

/// Child order of `w:pPr` (ECMA-376 CT_PPrBase, then the trailing elements).
pub(crate) const PPR_ORDER: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

/// Child order of `w:rPr` (CT_RPr).
pub(crate) const RPR_ORDER: &[&str] = &[
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
    "rPrChange",
];

/// Inline containers whose runs belong to the enclosing paragraph.
const RUN_CONTAINERS: &[&str] = &[
    "hyperlink",
    "ins",
    "smartTag",
    "customXml",
    "fldSimple",
    "sdt",
    "sdtContent",
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Alignment {
    Left,
    Center,
}

impl Alignment {
    fn as_wml(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
        }
    }
}

/// Parse a WML boolean toggle element (e.g., w:b, w:i).
/// Present with no val or val != "0"/"false" means true.
fn wml_toggle(parent: &Element, name: &str) -> Option<bool> {
    parent.wml_child(name).map(|n| {
        n.attr(WML_NS, "val")
            .is_none_or(|v| v != "0" && v != "false" && v != "off")
    })
}

/// View over a `w:pPr` element (of a paragraph or a paragraph style).
pub(crate) struct ParagraphProperties<'a> {
    el: &'a mut Element,
}

impl<'a> ParagraphProperties<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    pub(crate) fn set_alignment(&mut self, alignment: Alignment) {
        self.el
            .ensure_wml_child("jc", PPR_ORDER)
            .set_attr(WML_NS, "val", alignment.as_wml());
    }

    /// Negative values are written as a hanging indent.
    pub(crate) fn set_first_line_indent(&mut self, pts: f32) {
        let ind = self.el.ensure_wml_child("ind", PPR_ORDER);
        ind.remove_attr(WML_NS, "firstLineChars");
        ind.remove_attr(WML_NS, "hangingChars");
        if pts < 0.0 {
            ind.remove_attr(WML_NS, "firstLine");
            ind.set_attr(WML_NS, "hanging", &pts_to_twips(-pts).to_string());
        } else {
            ind.remove_attr(WML_NS, "hanging");
            ind.set_attr(WML_NS, "firstLine", &pts_to_twips(pts).to_string());
        }
    }

    pub(crate) fn set_left_indent(&mut self, pts: f32) {
        let ind = self.el.ensure_wml_child("ind", PPR_ORDER);
        ind.remove_attr(WML_NS, "start");
        ind.remove_attr(WML_NS, "leftChars");
        ind.remove_attr(WML_NS, "startChars");
        ind.set_attr(WML_NS, "left", &pts_to_twips(pts).to_string());
    }

    pub(crate) fn set_page_break_before(&mut self, on: bool) {
        self.el
            .ensure_wml_child("pageBreakBefore", PPR_ORDER)
            .set_attr(WML_NS, "val", if on { "1" } else { "0" });
    }

    pub(crate) fn set_single_spacing(&mut self) {
        let spacing = self.el.ensure_wml_child("spacing", PPR_ORDER);
        spacing.set_attr(WML_NS, "line", "240");
        spacing.set_attr(WML_NS, "lineRule", "auto");
    }
}

#[cfg(test)]
impl ParagraphProperties<'_> {
    pub(crate) fn alignment(&self) -> Option<Alignment> {
        self.el.wml_val("jc").and_then(|v| match v {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            _ => None,
        })
    }

    /// First-line indent in points; a hanging indent reads as a negative value.
    pub(crate) fn first_line_indent(&self) -> Option<f32> {
        let ind = self.el.wml_child("ind")?;
        let twips = |name| {
            ind.attr(WML_NS, name)
                .and_then(|v| v.parse::<f32>().ok())
                .map(twips_to_pts)
        };
        twips("hanging").map(|h| -h).or_else(|| twips("firstLine"))
    }

    pub(crate) fn left_indent(&self) -> Option<f32> {
        let ind = self.el.wml_child("ind")?;
        ind.attr(WML_NS, "left")
            .or_else(|| ind.attr(WML_NS, "start"))
            .and_then(|v| v.parse::<f32>().ok())
            .map(twips_to_pts)
    }

    pub(crate) fn page_break_before(&self) -> Option<bool> {
        wml_toggle(self.el, "pageBreakBefore")
    }

    /// Line-spacing multiplier when the spacing rule is proportional.
    pub(crate) fn line_spacing(&self) -> Option<f32> {
        let spacing = self.el.wml_child("spacing")?;
        let rule = spacing.attr(WML_NS, "lineRule").unwrap_or("auto");
        if rule != "auto" {
            return None;
        }
        spacing
            .attr(WML_NS, "line")
            .and_then(|v| v.parse::<f32>().ok())
            .map(|v| v / 240.0)
    }
}

/// View over a `w:rPr` element (of a run or a style).
pub(crate) struct RunProperties<'a> {
    el: &'a mut Element,
}

impl<'a> RunProperties<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    /// Western typeface for `w:ascii`/`w:hAnsi`, East-Asian for `w:eastAsia`.
    /// Theme font references would override the explicit names, so they go.
    pub(crate) fn set_fonts(&mut self, western: &str, east_asian: &str) {
        let fonts = self.el.ensure_wml_child("rFonts", RPR_ORDER);
        for theme in ["asciiTheme", "hAnsiTheme", "eastAsiaTheme"] {
            fonts.remove_attr(WML_NS, theme);
        }
        fonts.set_attr(WML_NS, "ascii", western);
        fonts.set_attr(WML_NS, "hAnsi", western);
        fonts.set_attr(WML_NS, "eastAsia", east_asian);
    }

    pub(crate) fn set_size(&mut self, pts: f32) {
        let half_points = (pts * 2.0).round() as u32;
        self.el
            .ensure_wml_child("sz", RPR_ORDER)
            .set_attr(WML_NS, "val", &half_points.to_string());
    }

    pub(crate) fn clear_color(&mut self) {
        self.el.remove_wml_children("color");
    }

    pub(crate) fn set_bold(&mut self, value: Option<bool>) {
        self.set_toggle("b", value);
    }

    pub(crate) fn set_italic(&mut self, value: Option<bool>) {
        self.set_toggle("i", value);
    }

    pub(crate) fn set_underline(&mut self, value: Option<bool>) {
        match value {
            None => self.el.remove_wml_children("u"),
            Some(on) => self
                .el
                .ensure_wml_child("u", RPR_ORDER)
                .set_attr(WML_NS, "val", if on { "single" } else { "none" }),
        }
    }

    /// `None` removes the element so the style value applies again; `Some(false)`
    /// writes an explicit off toggle.
    fn set_toggle(&mut self, name: &str, value: Option<bool>) {
        match value {
            None => self.el.remove_wml_children(name),
            Some(true) => self
                .el
                .ensure_wml_child(name, RPR_ORDER)
                .remove_attr(WML_NS, "val"),
            Some(false) => self
                .el
                .ensure_wml_child(name, RPR_ORDER)
                .set_attr(WML_NS, "val", "0"),
        }
    }
}

#[cfg(test)]
impl RunProperties<'_> {
    pub(crate) fn fonts(&self) -> (Option<&str>, Option<&str>) {
        let fonts = self.el.wml_child("rFonts");
        (
            fonts.and_then(|f| f.attr(WML_NS, "ascii")),
            fonts.and_then(|f| f.attr(WML_NS, "eastAsia")),
        )
    }

    pub(crate) fn size(&self) -> Option<f32> {
        self.el
            .wml_val("sz")
            .and_then(|v| v.parse::<f32>().ok())
            .map(|half_points| half_points / 2.0)
    }

    pub(crate) fn has_color(&self) -> bool {
        self.el.wml_child("color").is_some()
    }

    pub(crate) fn bold(&self) -> Option<bool> {
        wml_toggle(self.el, "b")
    }

    pub(crate) fn italic(&self) -> Option<bool> {
        wml_toggle(self.el, "i")
    }

    pub(crate) fn underline(&self) -> Option<bool> {
        self.el.wml_child("u").map(|u| {
            u.attr(WML_NS, "val")
                .is_none_or(|v| v != "none")
        })
    }
}

/// A `w:r` element.
pub(crate) struct Run<'a> {
    el: &'a mut Element,
}

impl<'a> Run<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    pub(crate) fn properties(&mut self) -> RunProperties<'_> {
        RunProperties::new(self.el.ensure_first_wml_child("rPr"))
    }

    pub(crate) fn italic(&self) -> Option<bool> {
        self.el.wml_child("rPr").and_then(|rpr| wml_toggle(rpr, "i"))
    }

    /// Appends raw content (after any `w:rPr`) to the run.
    pub(crate) fn append(&mut self, child: Element) {
        self.el.push(child);
    }

    fn append_text(&mut self, text: &str) {
        let mut first = true;
        for line in text.split('\n') {
            if !first {
                self.el.push(Element::wml("br"));
            }
            first = false;
            let mut first_cell = true;
            for cell in line.split('\t') {
                if !first_cell {
                    self.el.push(Element::wml("tab"));
                }
                first_cell = false;
                if cell.is_empty() {
                    continue;
                }
                let t = self.el.push(Element::wml("t"));
                if cell.starts_with(char::is_whitespace) || cell.ends_with(char::is_whitespace) {
                    t.set_attr(XML_NS, "space", "preserve");
                }
                t.push_text(cell);
            }
        }
    }
}

fn push_run_text(run: &Element, out: &mut String) {
    for child in run.elements().filter(|c| c.ns.as_deref() == Some(WML_NS)) {
        match child.local.as_str() {
            "t" => out.push_str(&child.text()),
            "tab" | "ptab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            "noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

fn push_paragraph_text(parent: &Element, out: &mut String) {
    for child in parent.elements().filter(|c| c.ns.as_deref() == Some(WML_NS)) {
        if child.local == "r" {
            push_run_text(child, out);
        } else if RUN_CONTAINERS.contains(&child.local.as_str()) {
            push_paragraph_text(child, out);
        }
    }
}

fn collect_runs<'e>(parent: &'e mut Element, out: &mut Vec<&'e mut Element>) {
    for child in parent.elements_mut() {
        if child.ns.as_deref() != Some(WML_NS) {
            continue;
        }
        if child.local == "r" {
            out.push(child);
        } else if RUN_CONTAINERS.contains(&child.local.as_str()) {
            collect_runs(child, out);
        }
    }
}

/// A `w:p` element.
pub(crate) struct Paragraph<'a> {
    el: &'a mut Element,
}

impl<'a> Paragraph<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    /// Plain-text projection: the text of every run, formatting ignored.
    pub(crate) fn text(&self) -> String {
        let mut out = String::new();
        push_paragraph_text(self.el, &mut out);
        out
    }

    pub(crate) fn properties(&mut self) -> ParagraphProperties<'_> {
        ParagraphProperties::new(self.el.ensure_first_wml_child("pPr"))
    }

    /// Removes all content, keeping paragraph-level formatting.
    pub(crate) fn clear(&mut self) {
        self.el
            .children
            .retain(|c| matches!(c, Node::Element(e) if e.is_wml("pPr")));
    }

    pub(crate) fn add_run(&mut self, text: &str) -> Run<'_> {
        let mut run = Run::new(self.el.push(Element::wml("r")));
        run.append_text(text);
        run
    }

    /// Every run of the paragraph in document order, including runs inside
    /// hyperlinks, insertions and content controls.
    pub(crate) fn runs(&mut self) -> Vec<Run<'_>> {
        let mut els = Vec::new();
        collect_runs(self.el, &mut els);
        els.into_iter().map(Run::new).collect()
    }
}
