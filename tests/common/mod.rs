#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use roxmltree::{Document, Node};
use zip::write::SimpleFileOptions;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const ROOT_NS: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml""#,
);

/// US Letter, 1 inch margins: what a fresh document from another template has.
pub const LETTER_SECTION: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/><w:cols w:space="720"/></w:sectPr>"#;

pub const DEFAULT_STYLES: &str = r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:asciiTheme="minorHAnsi" w:eastAsiaTheme="minorEastAsia" w:hAnsiTheme="minorHAnsi"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr><w:rPr><w:color w:val="1F3864"/></w:rPr></w:style><w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont"><w:name w:val="Default Paragraph Font"/></w:style>"#;

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `<w:p>` with one plain run.
pub fn para(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

/// `<w:p>` with one run carrying the given `w:rPr` content.
pub fn styled_para(rpr: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:rPr>{rpr}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

/// In-memory DOCX package builder.
pub struct Manuscript {
    body: Vec<String>,
    section: Option<String>,
    styles: Option<String>,
    header: Option<String>,
    extra: Vec<(String, Vec<u8>)>,
}

impl Manuscript {
    pub fn new() -> Self {
        Self {
            body: Vec::new(),
            section: Some(LETTER_SECTION.to_string()),
            styles: Some(DEFAULT_STYLES.to_string()),
            header: None,
            extra: Vec::new(),
        }
    }

    pub fn paragraphs(texts: &[&str]) -> Self {
        texts.iter().fold(Self::new(), |m, t| m.paragraph(t))
    }

    pub fn paragraph(self, text: &str) -> Self {
        self.raw(&para(text))
    }

    pub fn raw(mut self, xml: &str) -> Self {
        self.body.push(xml.to_string());
        self
    }

    pub fn section(mut self, section: Option<&str>) -> Self {
        self.section = section.map(String::from);
        self
    }

    pub fn styles(mut self, styles: Option<&str>) -> Self {
        self.styles = styles.map(String::from);
        self
    }

    /// An existing default header part (`word/header1.xml`, `rId7`) with the
    /// given body content.
    pub fn header(mut self, content: &str) -> Self {
        self.header = Some(content.to_string());
        self
    }

    pub fn entry(mut self, name: &str, data: &[u8]) -> Self {
        self.extra.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut section = self.section.clone().unwrap_or_default();
        if self.header.is_some() && !section.is_empty() {
            section = section.replacen(
                "<w:sectPr>",
                r#"<w:sectPr><w:headerReference w:type="default" r:id="rId7"/>"#,
                1,
            );
        }
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {ROOT_NS} mc:Ignorable="w14" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><w:body>{}{section}</w:body></w:document>"#,
            self.body.concat()
        );

        let mut overrides = String::from(
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        );
        let mut relationships = String::new();
        if self.styles.is_some() {
            overrides.push_str(r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
            relationships.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
        }
        if self.header.is_some() {
            overrides.push_str(r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#);
            relationships.push_str(r#"<Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#);
        }
        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{overrides}</Types>"#
        );
        let package_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
        let document_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
        );

        let mut entries: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".into(), content_types.into_bytes()),
            ("_rels/.rels".into(), package_rels.as_bytes().to_vec()),
            ("word/document.xml".into(), document.into_bytes()),
            ("word/_rels/document.xml.rels".into(), document_rels.into_bytes()),
        ];
        if let Some(styles) = &self.styles {
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles {ROOT_NS}>{styles}</w:styles>"#
            );
            entries.push(("word/styles.xml".into(), xml.into_bytes()));
        }
        if let Some(header) = &self.header {
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr {ROOT_NS}>{header}</w:hdr>"#
            );
            entries.push(("word/header1.xml".into(), xml.into_bytes()));
        }
        entries.extend(self.extra.iter().cloned());
        zip_entries(&entries)
    }
}

pub fn zip_entries(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn entry_names(docx: &[u8]) -> Vec<String> {
    let zip = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    zip.file_names().map(String::from).collect()
}

pub fn entry_bytes(docx: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut file = zip.by_name(name).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    Some(data)
}

pub fn entry_text(docx: &[u8], name: &str) -> String {
    let bytes = entry_bytes(docx, name).unwrap_or_else(|| panic!("{name} missing from package"));
    String::from_utf8(bytes).unwrap()
}

pub fn is_w(node: &Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(W_NS)
        && node.tag_name().name() == local
}

pub fn child<'a, 'i>(node: Node<'a, 'i>, local: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|c| is_w(c, local))
}

pub fn descendants<'a, 'i>(node: Node<'a, 'i>, local: &str) -> Vec<Node<'a, 'i>> {
    node.descendants().filter(|c| is_w(c, local)).collect()
}

pub fn attr<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attribute((W_NS, local))
}

/// `w:val` of the named child element.
pub fn val<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    child(node, local).and_then(|c| attr(c, "val"))
}

pub fn body<'a, 'i>(doc: &'a Document<'i>) -> Node<'a, 'i> {
    child(doc.root_element(), "body").expect("w:body")
}

pub fn body_paragraphs<'a, 'i>(doc: &'a Document<'i>) -> Vec<Node<'a, 'i>> {
    body(doc).children().filter(|c| is_w(c, "p")).collect()
}

pub fn text(node: Node) -> String {
    descendants(node, "t")
        .into_iter()
        .filter_map(|t| t.text())
        .collect()
}

/// Paragraph property accessors over a parsed `w:p`.
pub struct Props<'a, 'i> {
    pub p: Node<'a, 'i>,
}

impl<'a, 'i> Props<'a, 'i> {
    fn ppr_child(&self, local: &str) -> Option<Node<'a, 'i>> {
        child(self.p, "pPr").and_then(|ppr| child(ppr, local))
    }

    fn ind_twips(&self, name: &str) -> Option<i32> {
        self.ppr_child("ind")
            .and_then(|ind| attr(ind, name))
            .map(|v| v.parse().unwrap())
    }

    pub fn first_line(&self) -> Option<i32> {
        self.ind_twips("hanging")
            .map(|h| -h)
            .or_else(|| self.ind_twips("firstLine"))
    }

    pub fn left(&self) -> Option<i32> {
        self.ind_twips("left")
    }

    pub fn has_char_indent(&self) -> bool {
        self.ppr_child("ind").is_some_and(|ind| {
            ["firstLineChars", "hangingChars", "leftChars"]
                .iter()
                .any(|a| attr(ind, a).is_some())
        })
    }

    pub fn jc(&self) -> Option<&'a str> {
        self.ppr_child("jc").and_then(|jc| attr(jc, "val"))
    }

    pub fn page_break_before(&self) -> Option<&'a str> {
        self.ppr_child("pageBreakBefore")
            .map(|e| attr(e, "val").unwrap_or("1"))
    }

    pub fn line(&self) -> Option<&'a str> {
        self.ppr_child("spacing").and_then(|s| attr(s, "line"))
    }

    pub fn runs(&self) -> Vec<Node<'a, 'i>> {
        descendants(self.p, "r")
    }
}

/// Run property accessors over a parsed `w:r`.
pub fn rpr_val<'a>(run: Node<'a, '_>, local: &str) -> Option<&'a str> {
    let rpr = child(run, "rPr")?;
    let el = child(rpr, local)?;
    Some(attr(el, "val").unwrap_or("1"))
}

pub fn run_fonts<'a>(run: Node<'a, '_>) -> (Option<&'a str>, Option<&'a str>, Option<&'a str>) {
    let fonts = child(run, "rPr").and_then(|rpr| child(rpr, "rFonts"));
    (
        fonts.and_then(|f| attr(f, "ascii")),
        fonts.and_then(|f| attr(f, "hAnsi")),
        fonts.and_then(|f| attr(f, "eastAsia")),
    )
}
