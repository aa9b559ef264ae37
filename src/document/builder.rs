//! Fresh documents generated with docx-rs
//!
//! Used wherever a document has to be created rather than edited: plain text
//! promotion, wrapping recovered legacy text, and the empty template the
//! fallback cloner copies into.

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, LineSpacing, Paragraph, Run, RunFonts};

use super::package::PackageError;

/// Font settings applied to generated body text.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font: String,
    /// Size in points.
    pub size: f32,
}

impl TextStyle {
    fn half_points(&self) -> usize {
        (self.size * 2.0).round().max(1.0) as usize
    }

    fn run(&self, text: &str) -> Run {
        Run::new()
            .add_text(text)
            .size(self.half_points())
            .fonts(RunFonts::new().ascii(&self.font).east_asia(&self.font))
    }
}

fn pack(docx: Docx) -> Result<Vec<u8>, PackageError> {
    let mut buffer = Vec::new();
    docx.build()
        .pack(Cursor::new(&mut buffer))
        .map_err(|e| PackageError::Generate(e.to_string()))?;
    Ok(buffer)
}

/// Spacing for promoted text: 1.15 lines, 6pt after.
fn body_spacing() -> LineSpacing {
    LineSpacing::new().line(276).after(120)
}

pub fn blank_document() -> Result<Vec<u8>, PackageError> {
    pack(Docx::new())
}

/// One paragraph per non-blank line; blank lines produce nothing.
pub fn plain_text_document(text: &str, style: &TextStyle) -> Result<Vec<u8>, PackageError> {
    let mut docx = Docx::new();
    let mut paragraphs = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(style.run(line))
                .line_spacing(body_spacing()),
        );
        paragraphs += 1;
    }

    if paragraphs == 0 {
        docx = docx.add_paragraph(Paragraph::new());
    }

    pack(docx)
}

/// Title naming the recovery method, a separator rule, then the body.
pub fn recovered_document(
    method: &str,
    paragraphs: &[String],
    style: &TextStyle,
) -> Result<Vec<u8>, PackageError> {
    let title = Paragraph::new()
        .add_run(
            Run::new()
                .add_text(format!("Recovered from legacy document ({method})"))
                .bold()
                .size(style.half_points() + 4),
        )
        .align(AlignmentType::Center);

    let mut docx = Docx::new()
        .add_paragraph(title)
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text("=".repeat(50))))
        .add_paragraph(Paragraph::new());

    for text in paragraphs {
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(style.run(text))
                .line_spacing(body_spacing()),
        );
    }

    pack(docx)
}
