//! Relationship and content-type bookkeeping for parts added to a package.

use super::{
    CONTENT_TYPES_NS, CONTENT_TYPES_PART, DOCUMENT_RELS_PART, Element, PKG_REL_NS, Package,
    REL_NS, WML_NS,
};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PartKind {
    Header,
    Footer,
}

impl PartKind {
    pub(crate) fn stem(self) -> &'static str {
        match self {
            PartKind::Header => "header",
            PartKind::Footer => "footer",
        }
    }

    /// Root element local name (`w:hdr` / `w:ftr`).
    fn root(self) -> &'static str {
        match self {
            PartKind::Header => "hdr",
            PartKind::Footer => "ftr",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            PartKind::Header => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"
            }
            PartKind::Footer => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"
            }
        }
    }

    fn relationship_type(self) -> &'static str {
        match self {
            PartKind::Header => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header"
            }
            PartKind::Footer => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer"
            }
        }
    }
}

/// Zip path for a relationship target of the main document part.
fn resolve_target(target: &str) -> String {
    target
        .strip_prefix('/')
        .map(String::from)
        .unwrap_or_else(|| format!("word/{}", target))
}

/// Resolves a relationship id from `word/document.xml` to the part it points at.
pub(crate) fn part_for_relationship(pkg: &mut Package, rid: &str) -> Result<Option<String>, Error> {
    if !pkg.load_part(DOCUMENT_RELS_PART)? {
        return Ok(None);
    }
    let target = pkg.part(DOCUMENT_RELS_PART).and_then(|rels| {
        rels.elements()
            .filter(|n| n.local == "Relationship")
            .find(|n| n.plain_attr("Id") == Some(rid))
            .and_then(|n| n.plain_attr("Target"))
            .map(resolve_target)
    });
    Ok(target)
}

fn next_relationship_id(rels: &Element) -> String {
    let highest = rels
        .elements()
        .filter_map(|n| n.plain_attr("Id"))
        .filter_map(|id| id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", highest + 1)
}

fn free_part_name(pkg: &Package, kind: PartKind) -> String {
    (1..)
        .map(|n| format!("word/{}{}.xml", kind.stem(), n))
        .find(|name| !pkg.has_entry(name))
        .unwrap_or_else(|| format!("word/{}.xml", kind.stem()))
}

/// Creates an empty header or footer part holding one paragraph, registers it
/// with the main document and returns `(part name, relationship id)`.
pub(crate) fn add_part(pkg: &mut Package, kind: PartKind) -> Result<(String, String), Error> {
    let name = free_part_name(pkg, kind);

    let mut root = Element::wml(kind.root());
    root.declare("w", WML_NS);
    root.declare("r", REL_NS);
    root.push(Element::wml("p"));
    pkg.insert_part(&name, root);

    if !pkg.load_part(DOCUMENT_RELS_PART)? {
        let mut rels = Element::new(PKG_REL_NS, "Relationships");
        rels.namespaces.push((None, PKG_REL_NS.into()));
        pkg.insert_part(DOCUMENT_RELS_PART, rels);
    }
    let rels = pkg
        .part_mut(DOCUMENT_RELS_PART)
        .ok_or_else(|| Error::Precondition("document relationships unavailable".into()))?;
    let rid = next_relationship_id(rels);
    let target = name.strip_prefix("word/").unwrap_or(&name).to_string();
    let mut rel = Element::new(PKG_REL_NS, "Relationship");
    rel.set_plain_attr("Id", &rid);
    rel.set_plain_attr("Type", kind.relationship_type());
    rel.set_plain_attr("Target", &target);
    rels.push(rel);

    let types = pkg
        .part_mut(CONTENT_TYPES_PART)
        .ok_or_else(|| Error::InvalidDocx("missing [Content_Types].xml".into()))?;
    let mut over = Element::new(CONTENT_TYPES_NS, "Override");
    over.set_plain_attr("PartName", &format!("/{name}"));
    over.set_plain_attr("ContentType", kind.content_type());
    types.push(over);

    log::info!("Created {} part {} ({})", kind.stem(), name, rid);
    Ok((name, rid))
}
