//! Page geometry, base style and header/footer set-up, run once per document
//! before the paragraph pass.

use crate::docx::{
    self, DOCUMENT_PART, Element, Package, PartKind, REL_NS, STYLES_PART, WML_NS, cm_to_twips,
};
use crate::error::Error;
use crate::fonts::{self, BODY_SIZE, HEADER_FOOTER_SIZE};
use crate::model::{Alignment, Paragraph, ParagraphProperties, RunProperties};

pub(crate) const PAGE_WIDTH_CM: f32 = 21.0;
pub(crate) const PAGE_HEIGHT_CM: f32 = 29.7;
pub(crate) const MARGIN_CM: f32 = 2.0;

/// Child order of `w:sectPr` (CT_SectPr).
const SECT_ORDER: &[&str] = &[
    "headerReference",
    "footerReference",
    "footnotePr",
    "endnotePr",
    "type",
    "pgSz",
    "pgMar",
    "paperSrc",
    "pgBorders",
    "lnNumType",
    "pgNumType",
    "cols",
    "formProt",
    "vAlign",
    "noEndnote",
    "titlePg",
    "textDirection",
    "bidi",
    "rtlGutter",
    "docGrid",
    "printerSettings",
    "sectPrChange",
];

/// Child order of `w:style` (CT_Style).
const STYLE_ORDER: &[&str] = &[
    "name",
    "aliases",
    "basedOn",
    "next",
    "link",
    "autoRedefine",
    "hidden",
    "uiPriority",
    "semiHidden",
    "unhideWhenUsed",
    "qFormat",
    "locked",
    "personal",
    "personalCompose",
    "personalReply",
    "rsid",
    "pPr",
    "rPr",
    "tblPr",
    "trPr",
    "tcPr",
    "tblStylePr",
];

/// Applies the fixed page set-up: A4 with 2 cm margins, single-spaced Normal
/// style, the title centered in the header and a centered page number in the
/// footer.
pub(crate) fn prepare_page(pkg: &mut Package, title: &str) -> Result<(), Error> {
    set_page_geometry(pkg)?;
    set_base_style(pkg)?;

    let header = header_footer_part(pkg, PartKind::Header)?;
    {
        let mut para = first_paragraph(pkg, &header)?;
        para.clear();
        para.properties().set_alignment(Alignment::Center);
        let mut run = para.add_run(title);
        fonts::apply_font_pair(&mut run.properties(), HEADER_FOOTER_SIZE);
    }

    let footer = header_footer_part(pkg, PartKind::Footer)?;
    {
        let mut para = first_paragraph(pkg, &footer)?;
        para.clear();
        para.properties().set_alignment(Alignment::Center);
        let mut run = para.add_run("");
        fonts::insert_page_number_field(&mut run);
        fonts::apply_font_pair(&mut run.properties(), HEADER_FOOTER_SIZE);
    }

    log::debug!("Page set-up done (header {header}, footer {footer})");
    Ok(())
}

fn has_section(p: &Element) -> bool {
    p.wml_child("pPr")
        .is_some_and(|ppr| ppr.wml_child("sectPr").is_some())
}

/// The first section of the document: the first paragraph-level section break,
/// or the body-level `w:sectPr` when the document has a single section.
fn primary_section(body: &mut Element) -> Option<&mut Element> {
    let first_break = body
        .elements()
        .filter(|e| e.is_wml("p"))
        .position(has_section);
    match first_break {
        Some(n) => body
            .elements_mut()
            .filter(|e| e.is_wml("p"))
            .nth(n)?
            .wml_child_mut("pPr")?
            .wml_child_mut("sectPr"),
        None => body.wml_child_mut("sectPr"),
    }
}

fn section_mut(pkg: &mut Package) -> Result<&mut Element, Error> {
    pkg.body_mut()
        .and_then(primary_section)
        .ok_or_else(|| Error::Precondition("document has no section properties".into()))
}

fn set_page_geometry(pkg: &mut Package) -> Result<(), Error> {
    let section = section_mut(pkg)?;

    let pg_sz = section.ensure_wml_child("pgSz", SECT_ORDER);
    pg_sz.remove_attr(WML_NS, "orient");
    pg_sz.set_attr(WML_NS, "w", &cm_to_twips(PAGE_WIDTH_CM).to_string());
    pg_sz.set_attr(WML_NS, "h", &cm_to_twips(PAGE_HEIGHT_CM).to_string());

    let margin = cm_to_twips(MARGIN_CM).to_string();
    let pg_mar = section.ensure_wml_child("pgMar", SECT_ORDER);
    for side in ["top", "bottom", "left", "right"] {
        pg_mar.set_attr(WML_NS, side, &margin);
    }
    for (attr, default) in [("header", "851"), ("footer", "992"), ("gutter", "0")] {
        if pg_mar.attr(WML_NS, attr).is_none() {
            pg_mar.set_attr(WML_NS, attr, default);
        }
    }
    Ok(())
}

fn is_paragraph_style(style: &Element) -> bool {
    style.is_wml("style") && style.attr(WML_NS, "type") == Some("paragraph")
}

fn set_base_style(pkg: &mut Package) -> Result<(), Error> {
    if !pkg.load_part(STYLES_PART)? {
        return Err(Error::Precondition("missing word/styles.xml".into()));
    }
    let styles = pkg
        .part_mut(STYLES_PART)
        .ok_or_else(|| Error::Precondition("missing word/styles.xml".into()))?;

    let idx = styles
        .elements()
        .position(|s| is_paragraph_style(s) && s.attr(WML_NS, "styleId") == Some("Normal"))
        .or_else(|| {
            styles.elements().position(|s| {
                is_paragraph_style(s)
                    && s.attr(WML_NS, "default")
                        .is_some_and(|v| v == "1" || v == "true")
            })
        });

    let idx = match idx {
        Some(i) => i,
        None => {
            log::warn!("No Normal paragraph style; adding one");
            let mut style = Element::wml("style");
            style.set_attr(WML_NS, "type", "paragraph");
            style.set_attr(WML_NS, "default", "1");
            style.set_attr(WML_NS, "styleId", "Normal");
            style.push(Element::wml("name").with_val("Normal"));
            styles.push(style);
            styles.elements().count() - 1
        }
    };
    let normal = styles
        .elements_mut()
        .nth(idx)
        .ok_or_else(|| Error::Precondition("Normal style unavailable".into()))?;

    ParagraphProperties::new(normal.ensure_wml_child("pPr", STYLE_ORDER)).set_single_spacing();
    fonts::apply_font_pair(
        &mut RunProperties::new(normal.ensure_wml_child("rPr", STYLE_ORDER)),
        BODY_SIZE,
    );
    Ok(())
}

/// Name of the section's own default header (footer) part, creating and
/// linking a new part when the section inherits one or has none.
fn header_footer_part(pkg: &mut Package, kind: PartKind) -> Result<String, Error> {
    let reference = match kind {
        PartKind::Header => "headerReference",
        PartKind::Footer => "footerReference",
    };
    let rid = section_mut(pkg)?
        .elements()
        .filter(|e| e.is_wml(reference))
        .find(|e| e.attr(WML_NS, "type").is_none_or(|t| t == "default"))
        .and_then(|e| e.attr(REL_NS, "id"))
        .map(String::from);

    if let Some(rid) = rid {
        let name = docx::part_for_relationship(pkg, &rid)?
            .filter(|name| pkg.has_entry(name))
            .ok_or_else(|| {
                Error::Precondition(format!("{} {rid} points at no part", kind.stem()))
            })?;
        if !pkg.load_part(&name)? {
            return Err(Error::Precondition(format!("cannot read {name}")));
        }
        return Ok(name);
    }

    let (name, rid) = docx::add_part(pkg, kind)?;
    if let Some(document) = pkg.part_mut(DOCUMENT_PART) {
        document.declare("r", REL_NS);
    }
    let mut link = Element::wml(reference);
    link.set_attr(WML_NS, "type", "default");
    link.set_attr(REL_NS, "id", &rid);
    section_mut(pkg)?.insert_ordered(link, SECT_ORDER);
    Ok(name)
}

/// First top-level paragraph of a header/footer part, added if the part has none.
fn first_paragraph<'p>(pkg: &'p mut Package, name: &str) -> Result<Paragraph<'p>, Error> {
    let root = pkg
        .part_mut(name)
        .ok_or_else(|| Error::Precondition(format!("cannot read {name}")))?;
    if !root.elements().any(|e| e.is_wml("p")) {
        root.push(Element::wml("p"));
    }
    root.elements_mut()
        .find(|e| e.is_wml("p"))
        .map(Paragraph::new)
        .ok_or_else(|| Error::Precondition(format!("{name} has no paragraph")))
}
