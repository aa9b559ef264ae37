//! Document loading
//!
//! `load_document()` turns a `.docx` or `.txt` path into a [`LoadedDocument`]:
//! the editable package, its image cache and the style names it uses.
//! Plain text is promoted to a generated Word document first.

use std::collections::BTreeSet;
use std::path::Path;

use super::builder::{self, TextStyle};
use super::io::{LoadError, SourceFormat, read_limited, source_format, validate_docx_bytes};
use super::media::ImageCache;
use super::package::DocxPackage;
use super::wordml::{self, PARA_PROPS, RUN_PROPS};
use crate::encoding::{TEXT_FILE_ENCODINGS, decode_with_priority};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub text_style: TextStyle,
    pub max_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub package: DocxPackage,
    pub images: ImageCache,
    pub styles: BTreeSet<String>,
    pub format: SourceFormat,
}

pub fn load_document(path: &Path, options: &LoadOptions) -> Result<LoadedDocument, LoadError> {
    let format = source_format(path)?;
    let data = read_limited(path, options.max_bytes)?;

    let package = match format {
        SourceFormat::Docx => validate_docx_bytes(&data)?,
        SourceFormat::Txt => promote_text(&data, &options.text_style)?,
    };

    let images = ImageCache::from_package(&package);
    let styles = collect_styles(&package);

    Ok(LoadedDocument {
        package,
        images,
        styles,
        format,
    })
}

/// Build a Word document from raw text bytes.
pub fn promote_text(data: &[u8], style: &TextStyle) -> Result<DocxPackage, LoadError> {
    let (text, _) =
        decode_with_priority(data, TEXT_FILE_ENCODINGS).ok_or(LoadError::Undecodable)?;
    let bytes = builder::plain_text_document(&text, style)?;
    Ok(DocxPackage::from_bytes(&bytes)?)
}

/// Paragraph and character style names used by body paragraphs.
pub fn collect_styles(package: &DocxPackage) -> BTreeSet<String> {
    let names = package.style_names();
    let resolve = |id: &str| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    let mut styles = BTreeSet::new();

    for paragraph in package.body().elements().filter(|el| wordml::is_paragraph(el)) {
        let style = wordml::prop_val(paragraph.child(PARA_PROPS), "w:pStyle")
            .map(resolve)
            .unwrap_or_else(|| "Normal".to_string());
        styles.insert(style);

        for run in wordml::runs(paragraph) {
            if let Some(id) = wordml::prop_val(run.child(RUN_PROPS), "w:rStyle") {
                styles.insert(resolve(id));
            }
        }
    }

    styles
}
