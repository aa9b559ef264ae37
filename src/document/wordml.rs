//! WordprocessingML navigation helpers
//!
//! Paragraph, run and table accessors over the owned XML tree, plus the
//! few mutations the replacer needs (setting run text, highlighting).

use super::xml::{XmlElement, XmlNode};

pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";
pub const TABLE: &str = "w:tbl";
pub const ROW: &str = "w:tr";
pub const CELL: &str = "w:tc";
pub const RUN_PROPS: &str = "w:rPr";
pub const PARA_PROPS: &str = "w:pPr";
pub const VAL: &str = "w:val";

/// Inline wrappers whose runs still belong to the paragraph's visible text.
const INLINE_CONTAINERS: &[&str] = &[
    "w:hyperlink",
    "w:ins",
    "w:smartTag",
    "w:fldSimple",
    "w:sdt",
    "w:sdtContent",
    "w:customXml",
    "w:moveTo",
];

/// Run children that carry text and are rewritten when the run text changes.
const TEXT_CHILDREN: &[&str] = &["w:t", "w:tab", "w:br", "w:cr", "w:noBreakHyphen"];

/// `w:rPr` children that must come after `w:highlight` (ECMA-376 order).
const AFTER_HIGHLIGHT: &[&str] = &[
    "w:u",
    "w:effect",
    "w:bdr",
    "w:shd",
    "w:fitText",
    "w:vertAlign",
    "w:rtl",
    "w:cs",
    "w:em",
    "w:lang",
    "w:eastAsianLayout",
    "w:specVanish",
    "w:oMath",
    "w:rPrChange",
];

/// Index path from a paragraph element down to one of its runs.
pub type RunPath = Vec<usize>;

pub fn is_paragraph(el: &XmlElement) -> bool {
    el.name == PARAGRAPH
}

pub fn is_table(el: &XmlElement) -> bool {
    el.name == TABLE
}

/// Paths to every run in the paragraph, in reading order.
pub fn run_paths(paragraph: &XmlElement) -> Vec<RunPath> {
    let mut paths = Vec::new();
    collect_runs(paragraph, &mut Vec::new(), &mut paths);
    paths
}

fn collect_runs(el: &XmlElement, prefix: &mut Vec<usize>, out: &mut Vec<RunPath>) {
    for (i, node) in el.children.iter().enumerate() {
        let XmlNode::Element(child) = node else {
            continue;
        };
        if child.name == RUN {
            let mut path = prefix.clone();
            path.push(i);
            out.push(path);
        } else if INLINE_CONTAINERS.contains(&child.name.as_str()) {
            prefix.push(i);
            collect_runs(child, prefix, out);
            prefix.pop();
        }
    }
}

pub fn runs(paragraph: &XmlElement) -> Vec<&XmlElement> {
    run_paths(paragraph)
        .iter()
        .filter_map(|path| paragraph.at_path(path))
        .collect()
}

pub fn run_text(run: &XmlElement) -> String {
    let mut text = String::new();
    for child in run.elements() {
        match child.name.as_str() {
            "w:t" => text.push_str(&child.text()),
            "w:tab" => text.push('\t'),
            "w:br" | "w:cr" => text.push('\n'),
            "w:noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

pub fn paragraph_text(paragraph: &XmlElement) -> String {
    runs(paragraph).into_iter().map(run_text).collect()
}

/// Replace the text-bearing children of a run, keeping `w:rPr`, drawings and
/// anything else in place. Tabs and line breaks become `w:tab` / `w:br`.
pub fn set_run_text(run: &mut XmlElement, text: &str) {
    let first_text_slot = run.children.iter().position(
        |node| matches!(node, XmlNode::Element(el) if TEXT_CHILDREN.contains(&el.name.as_str())),
    );
    run.children.retain(
        |node| !matches!(node, XmlNode::Element(el) if TEXT_CHILDREN.contains(&el.name.as_str())),
    );

    let insert_at = match first_text_slot {
        Some(slot) => slot.min(run.children.len()),
        None => run
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.name == RUN_PROPS))
            .map(|i| i + 1)
            .unwrap_or(0),
    };

    let nodes = text_nodes(text);
    run.children.splice(insert_at..insert_at, nodes);
}

fn text_nodes(text: &str) -> Vec<XmlNode> {
    let mut nodes = Vec::new();
    let mut pending = String::new();
    let flush = |pending: &mut String, nodes: &mut Vec<XmlNode>| {
        if !pending.is_empty() {
            let mut t = XmlElement::new("w:t").with_attr("xml:space", "preserve");
            t.set_text(std::mem::take(pending));
            nodes.push(XmlNode::Element(t));
        }
    };
    for c in text.chars() {
        match c {
            '\t' => {
                flush(&mut pending, &mut nodes);
                nodes.push(XmlNode::Element(XmlElement::new("w:tab")));
            }
            '\n' => {
                flush(&mut pending, &mut nodes);
                nodes.push(XmlNode::Element(XmlElement::new("w:br")));
            }
            '\r' => {}
            _ => pending.push(c),
        }
    }
    flush(&mut pending, &mut nodes);
    nodes
}

/// Mark a run with `<w:highlight w:val="{color}"/>`.
pub fn set_highlight(run: &mut XmlElement, color: &str) {
    if run.child(RUN_PROPS).is_none() {
        run.children
            .insert(0, XmlNode::Element(XmlElement::new(RUN_PROPS)));
    }
    let Some(props) = run.child_mut(RUN_PROPS) else {
        return;
    };
    if let Some(existing) = props.child_mut("w:highlight") {
        existing.set_attr(VAL, color);
        return;
    }
    let position = props
        .children
        .iter()
        .position(
            |node| matches!(node, XmlNode::Element(el) if AFTER_HIGHLIGHT.contains(&el.name.as_str())),
        )
        .unwrap_or(props.children.len());
    props.children.insert(
        position,
        XmlNode::Element(XmlElement::new("w:highlight").with_attr(VAL, color)),
    );
}

pub fn new_run() -> XmlElement {
    XmlElement::new(RUN)
}

/// On/off property such as `<w:b/>`, `<w:b w:val="0"/>`.
pub fn toggle(props: Option<&XmlElement>, name: &str) -> Option<bool> {
    let el = props?.child(name)?;
    Some(!matches!(
        el.attr(VAL),
        Some("0") | Some("false") | Some("off")
    ))
}

pub fn prop_val<'a>(props: Option<&'a XmlElement>, name: &str) -> Option<&'a str> {
    props?.child(name)?.attr(VAL)
}

pub fn has_image_marker(paragraph: &XmlElement) -> bool {
    paragraph
        .descendants()
        .iter()
        .any(|el| matches!(el.name.as_str(), "a:blip" | "pic:pic" | "v:imagedata"))
}

/// Rows of a table, each as its cells.
pub fn table_rows(table: &XmlElement) -> Vec<Vec<&XmlElement>> {
    table
        .children_named(ROW)
        .map(|row| row.children_named(CELL).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(children: Vec<XmlElement>) -> XmlElement {
        let mut run = XmlElement::new(RUN);
        for c in children {
            run.push(c);
        }
        run
    }

    fn t(text: &str) -> XmlElement {
        let mut el = XmlElement::new("w:t");
        el.set_text(text);
        el
    }

    #[test]
    fn hyperlink_runs_are_part_of_paragraph_text() {
        let para = XmlElement::new(PARAGRAPH)
            .with_child(run_with(vec![t("Visit ")]))
            .with_child(XmlElement::new("w:hyperlink").with_child(run_with(vec![t("our site")])))
            .with_child(XmlElement::new("w:del").with_child(run_with(vec![t("gone")])));
        assert_eq!(paragraph_text(&para), "Visit our site");
        assert_eq!(run_paths(&para), vec![vec![0], vec![1, 0]]);
    }

    #[test]
    fn set_run_text_keeps_properties_and_drawings() {
        let mut run = run_with(vec![
            XmlElement::new(RUN_PROPS).with_child(XmlElement::new("w:b")),
            t("old"),
            XmlElement::new("w:drawing"),
        ]);
        set_run_text(&mut run, "a\tb\nc");
        let names: Vec<_> = run.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["w:rPr", "w:t", "w:tab", "w:t", "w:br", "w:t", "w:drawing"]
        );
        assert_eq!(run_text(&run), "a\tb\nc");
    }

    #[test]
    fn highlight_is_inserted_before_underline() {
        let mut run = run_with(vec![
            XmlElement::new(RUN_PROPS)
                .with_child(XmlElement::new("w:b"))
                .with_child(XmlElement::new("w:u").with_attr(VAL, "single")),
            t("x"),
        ]);
        set_highlight(&mut run, "yellow");
        let props = run.child(RUN_PROPS).expect("rPr");
        let names: Vec<_> = props.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["w:b", "w:highlight", "w:u"]);

        set_highlight(&mut run, "green");
        let props = run.child(RUN_PROPS).expect("rPr");
        assert_eq!(props.children_named("w:highlight").count(), 1);
        assert_eq!(prop_val(Some(props), "w:highlight"), Some("green"));
    }

    #[test]
    fn toggles_honour_explicit_false() {
        let props = XmlElement::new(RUN_PROPS)
            .with_child(XmlElement::new("w:b"))
            .with_child(XmlElement::new("w:i").with_attr(VAL, "0"));
        assert_eq!(toggle(Some(&props), "w:b"), Some(true));
        assert_eq!(toggle(Some(&props), "w:i"), Some(false));
        assert_eq!(toggle(Some(&props), "w:u"), None);
    }
}
