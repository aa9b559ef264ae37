//! DOCX package container
//!
//! A package is kept as the ordered list of zip parts exactly as read. Only the
//! main document part is parsed (into an [`XmlDocument`]); everything else,
//! media included, is carried as raw bytes and written back in the same order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xml::{self, XmlDocument, XmlElement, XmlError};

pub const MAIN_PART_FALLBACK: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const CORE_PROPS_PART: &str = "docProps/core.xml";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const ROOT_RELS_PART: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// Upper bound on the uncompressed size of any single part.
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;
// Declared sizes come from the archive itself, so they only seed the buffer.
const PREALLOC_HINT: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("not a zip container: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: XmlError,
    },
    #[error("missing part {0}")]
    MissingPart(String),
    #[error("this appears to be an Excel workbook (.xlsx), not a Word document")]
    Spreadsheet,
    #[error("main document part has no body")]
    MissingBody,
    #[error("part {part} expands beyond {limit} bytes")]
    PartTooLarge { part: String, limit: u64 },
    #[error("failed to generate document: {0}")]
    Generate(String),
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

/// An opened .docx file.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    parts: Vec<Part>,
    main_part: String,
    document: XmlDocument,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self, PackageError> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        Self::from_bytes_with_limit(bytes, MAX_PART_BYTES)
    }

    /// Like [`DocxPackage::from_bytes`], failing once any part inflates past
    /// `part_limit` bytes whatever size its header declares.
    pub fn from_bytes_with_limit(bytes: &[u8], part_limit: u64) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let capacity = entry.size().min(part_limit).min(PREALLOC_HINT);
            let mut data = Vec::with_capacity(capacity as usize);
            entry
                .by_ref()
                .take(part_limit.saturating_add(1))
                .read_to_end(&mut data)?;
            if data.len() as u64 > part_limit {
                return Err(PackageError::PartTooLarge {
                    part: name,
                    limit: part_limit,
                });
            }
            parts.push(Part { name, data });
        }

        let main_part = resolve_main_part(&parts);
        let Some(main) = parts.iter().find(|p| p.name == main_part) else {
            if parts.iter().any(|p| p.name == "xl/workbook.xml") {
                return Err(PackageError::Spreadsheet);
            }
            return Err(PackageError::MissingPart(main_part));
        };

        let document = xml::parse(&main.data).map_err(|source| PackageError::Xml {
            part: main_part.clone(),
            source,
        })?;
        if document.root.child("w:body").is_none() {
            return Err(PackageError::MissingBody);
        }

        Ok(Self {
            parts,
            main_part,
            document,
        })
    }

    /// Re-zip every part in its original order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PackageError> {
        let main = self
            .document
            .to_bytes()
            .map_err(|source| PackageError::Xml {
                part: self.main_part.clone(),
                source,
            })?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for part in &self.parts {
            let method = if is_media(&part.name) {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(part.name.as_str(), options)?;
            if part.name == self.main_part {
                zip.write_all(&main)?;
            } else {
                zip.write_all(&part.data)?;
            }
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<(), PackageError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn main_part_name(&self) -> &str {
        &self.main_part
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut XmlDocument {
        &mut self.document
    }

    pub fn body(&self) -> &XmlElement {
        // Checked in `from_bytes`; an empty stand-in keeps this infallible.
        static EMPTY: XmlElement = XmlElement {
            name: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        };
        self.document.root.child("w:body").unwrap_or(&EMPTY)
    }

    pub fn body_mut(&mut self) -> Result<&mut XmlElement, PackageError> {
        self.document
            .root
            .child_mut("w:body")
            .ok_or(PackageError::MissingBody)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    /// Replace a part's bytes, appending the part if it does not exist yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Parse any XML part other than the main one.
    pub fn xml_part(&self, name: &str) -> Result<Option<XmlDocument>, PackageError> {
        let Some(data) = self.part(name) else {
            return Ok(None);
        };
        xml::parse(data)
            .map(Some)
            .map_err(|source| PackageError::Xml {
                part: name.to_string(),
                source,
            })
    }

    pub fn set_xml_part(&mut self, name: &str, doc: &XmlDocument) -> Result<(), PackageError> {
        let bytes = doc.to_bytes().map_err(|source| PackageError::Xml {
            part: name.to_string(),
            source,
        })?;
        self.set_part(name, bytes);
        Ok(())
    }

    pub fn media_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| is_media(&p.name))
    }

    /// Relationship part that belongs to `part`, e.g. `word/_rels/document.xml.rels`.
    pub fn rels_part_name(part: &str) -> String {
        match part.rsplit_once('/') {
            Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
            None => format!("_rels/{part}.rels"),
        }
    }

    /// Style id → display name, read from `word/styles.xml`.
    pub fn style_names(&self) -> HashMap<String, String> {
        let mut names = HashMap::new();
        let Ok(Some(styles)) = self.xml_part(STYLES_PART) else {
            return names;
        };
        for style in styles.root.children_named("w:style") {
            let Some(id) = style.attr("w:styleId") else {
                continue;
            };
            let name = style
                .child("w:name")
                .and_then(|n| n.attr("w:val"))
                .unwrap_or(id);
            names.insert(id.to_string(), name.to_string());
        }
        names
    }
}

pub(crate) fn is_media(name: &str) -> bool {
    name.starts_with("word/media/")
}

fn resolve_main_part(parts: &[Part]) -> String {
    let target = parts
        .iter()
        .find(|p| p.name == ROOT_RELS_PART)
        .and_then(|p| xml::parse(&p.data).ok())
        .and_then(|rels| {
            rels.root
                .children_named("Relationship")
                .find(|rel| {
                    rel.attr("Type")
                        .is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL))
                })
                .and_then(|rel| rel.attr("Target"))
                .map(|t| t.trim_start_matches('/').to_string())
        });
    target.unwrap_or_else(|| MAIN_PART_FALLBACK.to_string())
}

/// Quick structural check used before a full load.
pub(crate) fn looks_like_docx(bytes: &[u8]) -> bool {
    if !bytes.starts_with(b"PK\x03\x04") {
        return false;
    }
    let Ok(mut archive) = ZipArchive::new(Cursor::new(bytes)) else {
        return false;
    };
    let has_main = archive.by_name(MAIN_PART_FALLBACK).is_ok();
    has_main
}
