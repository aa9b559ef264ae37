//! Content extraction with formatting
//!
//! Walks the body of a package and produces the serializable content tree used
//! for previews. Extraction never mutates the package.

use std::collections::HashMap;

use super::media::ImageCache;
use super::models::*;
use super::package::DocxPackage;
use super::wordml::{self, PARA_PROPS, RUN_PROPS, VAL};
use super::xml::XmlElement;

const DEFAULT_PARAGRAPH_STYLE: &str = "Normal";
const DEFAULT_TABLE_STYLE: &str = "Table Grid";

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub fallback_font: String,
    pub max_images_per_paragraph: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            fallback_font: "Times New Roman".to_string(),
            max_images_per_paragraph: 3,
        }
    }
}

pub fn extract_content(
    package: &DocxPackage,
    images: &ImageCache,
    options: &ExtractOptions,
) -> Vec<ContentNode> {
    let styles = package.style_names();
    let extractor = Extractor {
        styles: &styles,
        images,
        options,
    };

    let mut content = Vec::new();
    let mut paragraph_index = 0;
    let mut table_index = 0;

    for element in package.body().elements() {
        if wordml::is_paragraph(element) {
            let index = paragraph_index;
            paragraph_index += 1;
            if let Some(node) = extractor.paragraph(element, index) {
                content.push(ContentNode::Paragraph(node));
            }
        } else if wordml::is_table(element) {
            content.push(ContentNode::Table(extractor.table(element, table_index)));
            table_index += 1;
        }
    }

    content
}

struct Extractor<'a> {
    styles: &'a HashMap<String, String>,
    images: &'a ImageCache,
    options: &'a ExtractOptions,
}

impl Extractor<'_> {
    fn paragraph(&self, paragraph: &XmlElement, index: usize) -> Option<ParagraphNode> {
        let runs: Vec<RunNode> = wordml::runs(paragraph)
            .into_iter()
            .map(|run| self.run(run))
            .collect();
        let text: String = runs.iter().map(|r| r.text.as_str()).collect();
        let has_image = wordml::has_image_marker(paragraph);

        if text.trim().is_empty() && !has_image {
            return None;
        }

        let images = if has_image {
            self.images
                .first_refs(self.options.max_images_per_paragraph)
        } else {
            Vec::new()
        };

        let props = paragraph.child(PARA_PROPS);
        Some(ParagraphNode {
            index,
            text,
            style: self.paragraph_style(props),
            alignment: TextAlignment::from_jc(wordml::prop_val(props, "w:jc")),
            paragraph_format: paragraph_format(props),
            runs,
            images,
        })
    }

    fn table(&self, table: &XmlElement, index: usize) -> TableNode {
        let style = table
            .find(&["w:tblPr", "w:tblStyle"])
            .and_then(|s| s.attr(VAL))
            .map(|id| self.style_name(id))
            .unwrap_or_else(|| DEFAULT_TABLE_STYLE.to_string());

        let rows = wordml::table_rows(table)
            .into_iter()
            .map(|cells| cells.into_iter().map(|cell| self.cell(cell)).collect())
            .collect();

        TableNode {
            index,
            style,
            table_format: table_format(table),
            rows,
        }
    }

    fn cell(&self, cell: &XmlElement) -> CellNode {
        let paragraphs: Vec<CellParagraph> = cell
            .children_named(wordml::PARAGRAPH)
            .map(|p| {
                let runs: Vec<RunNode> =
                    wordml::runs(p).into_iter().map(|r| self.run(r)).collect();
                let props = p.child(PARA_PROPS);
                CellParagraph {
                    text: runs.iter().map(|r| r.text.as_str()).collect(),
                    style: self.paragraph_style(props),
                    alignment: TextAlignment::from_jc(wordml::prop_val(props, "w:jc")),
                    runs,
                }
            })
            .collect();

        let text = paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        CellNode {
            text,
            paragraphs,
            cell_format: cell_format(cell),
        }
    }

    fn run(&self, run: &XmlElement) -> RunNode {
        let props = run.child(RUN_PROPS);

        let font_name = props
            .and_then(|p| p.child("w:rFonts"))
            .and_then(|f| {
                f.attr("w:ascii")
                    .or_else(|| f.attr("w:hAnsi"))
                    .or_else(|| f.attr("w:eastAsia"))
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.options.fallback_font.clone());

        let font_size = wordml::prop_val(props, "w:sz")
            .and_then(|v| v.parse::<f32>().ok())
            .map(|half_points| half_points / 2.0)
            .unwrap_or(12.0);

        let vert_align = wordml::prop_val(props, "w:vertAlign");

        RunNode {
            text: wordml::run_text(run),
            bold: wordml::toggle(props, "w:b"),
            italic: wordml::toggle(props, "w:i"),
            underline: props
                .and_then(|p| p.child("w:u"))
                .map(|u| u.attr(VAL) != Some("none")),
            font_name,
            font_size,
            font_color: wordml::prop_val(props, "w:color").and_then(rgb_from_hex),
            highlight_color: wordml::prop_val(props, "w:highlight")
                .filter(|v| *v != "none")
                .map(highlight_hex),
            subscript: vert_align.map(|v| v == "subscript"),
            superscript: vert_align.map(|v| v == "superscript"),
        }
    }

    fn paragraph_style(&self, props: Option<&XmlElement>) -> String {
        wordml::prop_val(props, "w:pStyle")
            .map(|id| self.style_name(id))
            .unwrap_or_else(|| DEFAULT_PARAGRAPH_STYLE.to_string())
    }

    fn style_name(&self, id: &str) -> String {
        self.styles
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

/// Twentieths of a point to points.
fn twips(value: Option<&str>) -> f32 {
    value
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v / 20.0)
        .unwrap_or(0.0)
}

fn paragraph_format(props: Option<&XmlElement>) -> ParagraphFormat {
    let mut format = ParagraphFormat::default();
    let Some(props) = props else {
        return format;
    };

    if let Some(spacing) = props.child("w:spacing") {
        format.space_before = twips(spacing.attr("w:before"));
        format.space_after = twips(spacing.attr("w:after"));
        if let Some(line) = spacing.attr("w:line").and_then(|v| v.parse::<f32>().ok()) {
            format.line_spacing = match spacing.attr("w:lineRule") {
                // exact / atLeast are absolute heights in twips
                Some("exact") | Some("atLeast") => line / 20.0,
                _ => line / 240.0,
            };
        }
    }

    if let Some(ind) = props.child("w:ind") {
        format.left_indent = twips(ind.attr("w:left").or_else(|| ind.attr("w:start")));
        format.right_indent = twips(ind.attr("w:right").or_else(|| ind.attr("w:end")));
        format.first_line_indent = match ind.attr("w:hanging") {
            Some(hanging) => -twips(Some(hanging)),
            None => twips(ind.attr("w:firstLine")),
        };
    }

    format
}

fn table_format(table: &XmlElement) -> TableFormat {
    let mut format = TableFormat::default();
    if let Some(top) = table.find(&["w:tblPr", "w:tblBorders", "w:top"]) {
        match top.attr(VAL) {
            Some("single") | None => {}
            Some("nil") | Some("none") => format.border_style = "none".to_string(),
            Some("dotted") => format.border_style = "dotted".to_string(),
            Some("dashed") => format.border_style = "dashed".to_string(),
            Some("double") => format.border_style = "double".to_string(),
            Some(_) => {}
        }
        if let Some(color) = top.attr("w:color").and_then(hex_color) {
            format.border_color = color;
        }
    }
    format
}

fn cell_format(cell: &XmlElement) -> CellFormat {
    let mut format = CellFormat::default();
    let Some(props) = cell.child("w:tcPr") else {
        return format;
    };
    format.background_color = props
        .child("w:shd")
        .and_then(|shd| shd.attr("w:fill"))
        .and_then(hex_color);
    if let Some(valign) = wordml::prop_val(Some(props), "w:vAlign") {
        format.vertical_alignment = valign.to_string();
    }
    if let Some(span) = wordml::prop_val(Some(props), "w:gridSpan").and_then(|v| v.parse().ok()) {
        format.grid_span = span;
    }
    format
}

fn hex_color(value: &str) -> Option<String> {
    (value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| format!("#{}", value.to_ascii_uppercase()))
}

/// `FF0000` → `rgb(255, 0, 0)`; `auto` and malformed values yield `None`.
pub(crate) fn rgb_from_hex(value: &str) -> Option<String> {
    if value.len() != 6 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&value[0..2], 16).ok()?;
    let g = u8::from_str_radix(&value[2..4], 16).ok()?;
    let b = u8::from_str_radix(&value[4..6], 16).ok()?;
    Some(format!("rgb({r}, {g}, {b})"))
}

fn highlight_hex(name: &str) -> String {
    match name {
        "black" => "#000000",
        "blue" => "#0000FF",
        "cyan" => "#00FFFF",
        "green" => "#00FF00",
        "magenta" => "#FF00FF",
        "red" => "#FF0000",
        "white" => "#FFFFFF",
        "darkBlue" => "#000080",
        "darkCyan" => "#008080",
        "darkGreen" => "#008000",
        "darkMagenta" => "#800080",
        "darkRed" => "#800000",
        "darkYellow" => "#808000",
        "darkGray" => "#808080",
        "lightGray" => "#C0C0C0",
        _ => "#FFFF00",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_rendered_as_rgb() {
        assert_eq!(rgb_from_hex("FF0000").as_deref(), Some("rgb(255, 0, 0)"));
        assert_eq!(rgb_from_hex("auto"), None);
        assert_eq!(rgb_from_hex("ab€c"), None);
        assert_eq!(rgb_from_hex("+F+F+F"), None);
        assert_eq!(highlight_hex("yellow"), "#FFFF00");
        assert_eq!(highlight_hex("green"), "#00FF00");
    }

    #[test]
    fn paragraph_format_converts_twips() {
        let props = XmlElement::new(PARA_PROPS)
            .with_child(
                XmlElement::new("w:spacing")
                    .with_attr("w:before", "240")
                    .with_attr("w:after", "120")
                    .with_attr("w:line", "276")
                    .with_attr("w:lineRule", "auto"),
            )
            .with_child(
                XmlElement::new("w:ind")
                    .with_attr("w:left", "720")
                    .with_attr("w:hanging", "360"),
            );
        let format = paragraph_format(Some(&props));
        assert_eq!(format.space_before, 12.0);
        assert_eq!(format.space_after, 6.0);
        assert!((format.line_spacing - 1.15).abs() < 1e-4);
        assert_eq!(format.left_indent, 36.0);
        assert_eq!(format.first_line_indent, -18.0);
    }
}
