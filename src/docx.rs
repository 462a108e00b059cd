mod parts;
mod xml;

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::Error;

pub(crate) use parts::{PartKind, add_part, part_for_relationship};
pub(crate) use xml::{Element, Node};

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const CONTENT_TYPES_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";
pub(crate) const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const STYLES_PART: &str = "word/styles.xml";
pub(crate) const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub(crate) fn pts_to_twips(pts: f32) -> i32 {
    (pts * 20.0).round() as i32
}

#[cfg(test)]
pub(crate) fn twips_to_pts(twips: f32) -> f32 {
    twips / 20.0
}

pub(crate) fn cm_to_twips(cm: f32) -> u32 {
    (cm * 1440.0 / 2.54).round() as u32
}

struct Entry {
    name: String,
    data: Vec<u8>,
}

/// A DOCX package held in memory.
///
/// Every ZIP entry is kept in archive order. Parts the formatter edits are
/// parsed into [`Element`] trees and re-serialized on save; everything else is
/// written back exactly as it was read.
pub struct Package {
    entries: Vec<Entry>,
    parts: HashMap<String, Element>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(Entry {
                name: file.name().to_string(),
                data,
            });
        }

        let mut package = Self {
            entries,
            parts: HashMap::new(),
        };

        if !package.load_part(DOCUMENT_PART)? {
            return Err(Error::InvalidDocx(
                "missing word/document.xml (is this a DOCX file?)".into(),
            ));
        }
        if !package.load_part(CONTENT_TYPES_PART)? {
            return Err(Error::InvalidDocx("missing [Content_Types].xml".into()));
        }
        if package.body().is_none() {
            return Err(Error::InvalidDocx("missing w:body".into()));
        }

        log::debug!(
            "Loaded package with {} entries",
            package.entries.len()
        );
        Ok(package)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            writer.start_file(entry.name.as_str(), options)?;
            match self.parts.get(&entry.name) {
                Some(root) => writer.write_all(root.to_xml().as_bytes())?,
                None => writer.write_all(&entry.data)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    pub(crate) fn has_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Parses entry `name` into an editable part. Returns `false` when the
    /// package has no such entry.
    pub(crate) fn load_part(&mut self, name: &str) -> Result<bool, Error> {
        if self.parts.contains_key(name) {
            return Ok(true);
        }
        let Some(entry) = self.entries.iter().find(|e| e.name == name) else {
            return Ok(false);
        };
        let text = std::str::from_utf8(&entry.data)
            .map_err(|_| Error::InvalidDocx(format!("{name} is not UTF-8 XML")))?;
        let root = Element::parse(text.trim_start_matches('\u{feff}'))?;
        self.parts.insert(name.to_string(), root);
        Ok(true)
    }

    pub(crate) fn part(&self, name: &str) -> Option<&Element> {
        self.parts.get(name)
    }

    pub(crate) fn part_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.parts.get_mut(name)
    }

    /// Adds a new part (or replaces an existing one) with `root` as content.
    pub(crate) fn insert_part(&mut self, name: &str, root: Element) {
        if !self.has_entry(name) {
            self.entries.push(Entry {
                name: name.to_string(),
                data: Vec::new(),
            });
        }
        self.parts.insert(name.to_string(), root);
    }

    pub(crate) fn body(&self) -> Option<&Element> {
        self.part(DOCUMENT_PART)?.wml_child("body")
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut Element> {
        self.part_mut(DOCUMENT_PART)?.wml_child_mut("body")
    }
}
