//! Typeface pairing and the PAGE field used in footers.

use crate::docx::{Element, WML_NS, XML_NS};
use crate::model::{Run, RunProperties};

/// Typeface for Latin glyphs.
pub(crate) const WESTERN_TYPEFACE: &str = "Times New Roman";
/// Typeface for CJK glyphs (PMingLiU).
pub(crate) const EAST_ASIAN_TYPEFACE: &str = "新細明體";

pub(crate) const BODY_SIZE: f32 = 12.0;
pub(crate) const HEADER_FOOTER_SIZE: f32 = 10.0;

/// Forces the Western/East-Asian typeface pair, sets the size and drops any
/// explicit color so the text renders in the automatic (black) color.
/// Applying it twice with the same size changes nothing.
pub(crate) fn apply_font_pair(props: &mut RunProperties, size: f32) {
    props.set_fonts(WESTERN_TYPEFACE, EAST_ASIAN_TYPEFACE);
    props.set_size(size);
    props.clear_color();
}

fn field_char(kind: &str) -> Element {
    let mut el = Element::wml("fldChar");
    el.set_attr(WML_NS, "fldCharType", kind);
    el
}

/// Appends a `PAGE` field (begin, instruction, end) to an empty run.
/// Calling it twice on one run yields two fields.
pub(crate) fn insert_page_number_field(run: &mut Run) {
    let mut instr = Element::wml("instrText");
    instr.set_attr(XML_NS, "space", "preserve");
    instr.push_text(" PAGE ");

    run.append(field_char("begin"));
    run.append(instr);
    run.append(field_char("end"));
}
