//! Core data structures for document representation
//!
//! This module defines the public, serializable content tree produced by the
//! extractor, plus the modification records and the document info summary.

use serde::{Deserialize, Serialize};

pub type TableRows = Vec<Vec<CellNode>>;

/// One top-level element of the content tree, in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    Paragraph(ParagraphNode),
    Table(TableNode),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParagraphNode {
    pub index: usize,
    pub text: String,
    pub style: String,
    pub alignment: TextAlignment,
    pub paragraph_format: ParagraphFormat,
    pub runs: Vec<RunNode>,
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableNode {
    pub index: usize,
    pub style: String,
    pub table_format: TableFormat,
    pub rows: TableRows,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellNode {
    pub text: String,
    pub paragraphs: Vec<CellParagraph>,
    pub cell_format: CellFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellParagraph {
    pub text: String,
    pub style: String,
    pub alignment: TextAlignment,
    pub runs: Vec<RunNode>,
}

/// Smallest span of uniform formatting. Tri-state flags are `None` when the
/// run inherits the value from its style.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunNode {
    pub text: String,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub font_name: String,
    pub font_size: f32,
    /// Rendered as `rgb(r, g, b)`.
    pub font_color: Option<String>,
    pub highlight_color: Option<String>,
    pub subscript: Option<bool>,
    pub superscript: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub filename: String,
    /// Base64 of the raw media bytes.
    #[serde(rename = "data")]
    pub base64_data: String,
    pub mime_type: String,
    pub embed_id: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlignment {
    /// Map a `w:jc` value; anything unknown falls back to left.
    pub fn from_jc(value: Option<&str>) -> Self {
        match value {
            Some("center") => TextAlignment::Center,
            Some("right") | Some("end") => TextAlignment::Right,
            Some("both") | Some("distribute") => TextAlignment::Justify,
            _ => TextAlignment::Left,
        }
    }
}

/// Paragraph spacing and indentation in points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParagraphFormat {
    pub space_before: f32,
    pub space_after: f32,
    pub line_spacing: f32,
    pub left_indent: f32,
    pub right_indent: f32,
    pub first_line_indent: f32,
}

impl Default for ParagraphFormat {
    fn default() -> Self {
        Self {
            space_before: 0.0,
            space_after: 0.0,
            line_spacing: 1.0,
            left_indent: 0.0,
            right_indent: 0.0,
            first_line_indent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableFormat {
    pub width: String,
    pub border_style: String,
    pub border_width: String,
    pub border_color: String,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            width: "100%".to_string(),
            border_style: "solid".to_string(),
            border_width: "1px".to_string(),
            border_color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellFormat {
    pub background_color: Option<String>,
    pub vertical_alignment: String,
    pub padding: String,
    pub grid_span: u32,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            background_color: None,
            vertical_alignment: "top".to_string(),
            padding: "5px".to_string(),
            grid_span: 1,
        }
    }
}

/// One requested substitution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Modification {
    pub original_text: String,
    pub new_text: String,
    #[serde(default)]
    pub reason: String,
}

impl Modification {
    pub fn new(original: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            original_text: original.into(),
            new_text: new.into(),
            reason: String::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentInfo {
    pub paragraph_count: usize,
    pub table_count: usize,
    pub image_count: usize,
    pub style_count: usize,
    pub modifications_count: usize,
}

/// Which of the processor's two documents to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DocumentSide {
    Original,
    Modified,
}
